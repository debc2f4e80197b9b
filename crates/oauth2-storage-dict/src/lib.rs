//! Store credentials in a dictionary-like container such as a session.

use std::sync::Arc;

use async_trait::async_trait;

use oauth2_core::{Credentials, DynCodec, JsonCredentialCodec, StorageError};
use oauth2_ports::{Container, DynLock, Lock, NoOpLock, Storage};

/// Keeps one encoded credential at `container[key]`.
///
/// The container and the lock belong to the caller; this type never clears,
/// closes or recreates either of them.
pub struct DictionaryStorage<C: Container> {
    container: Arc<C>,
    key: C::Key,
    lock: DynLock,
    codec: DynCodec,
}

impl<C: Container> DictionaryStorage<C> {
    /// `lock`, when given, is acquired around every read and write of `container[key]`.
    pub fn new(container: Arc<C>, key: C::Key, lock: Option<DynLock>) -> Self {
        Self {
            container,
            key,
            lock: lock.unwrap_or_else(NoOpLock::shared),
            codec: JsonCredentialCodec::shared(),
        }
    }

    pub fn with_codec(mut self, codec: DynCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn container(&self) -> &Arc<C> {
        &self.container
    }

    pub fn key(&self) -> &C::Key {
        &self.key
    }
}

#[async_trait]
impl<C: Container> Storage for DictionaryStorage<C> {
    fn lock(&self) -> &dyn Lock {
        self.lock.as_ref()
    }

    async fn locked_get(&self) -> Result<Option<Credentials>, StorageError> {
        let Some(serialized) = self.container.get_value(&self.key)? else {
            return Ok(None);
        };

        self.codec.decode(&serialized).map(Some)
    }

    async fn locked_put(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let serialized = self.codec.encode(credentials)?;
        self.container.set_value(&self.key, serialized)?;
        tracing::debug!("stored credentials in container");
        Ok(())
    }

    async fn locked_delete(&self) -> Result<(), StorageError> {
        self.container.remove_value(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_core::CredentialCodec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dashmap::DashMap;
    use oauth2_core::GOOGLE_TOKEN_URI;
    use oauth2_ports::{MemoryContainer, SemaphoreLock};

    fn generate_credentials() -> Credentials {
        Credentials::new("access_tokenz")
            .with_id_token("base64encodedjwtidtoken")
            .with_refresh_token("refresh_tokenz")
            .with_token_uri(GOOGLE_TOKEN_URI)
            .with_client("client_idz", "client_secretz")
    }

    fn storage_over(container: &Arc<MemoryContainer>) -> DictionaryStorage<MemoryContainer> {
        DictionaryStorage::new(Arc::clone(container), "credentials".to_string(), None)
    }

    #[derive(Default)]
    struct FakeLock {
        acquire_count: AtomicUsize,
        release_count: AtomicUsize,
    }

    #[async_trait]
    impl Lock for FakeLock {
        async fn acquire(&self) -> Result<(), StorageError> {
            self.acquire_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) -> Result<(), StorageError> {
            self.release_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Encodes credentials as their bare access token.
    struct TokenOnlyCodec;

    impl CredentialCodec for TokenOnlyCodec {
        fn encode(&self, credentials: &Credentials) -> Result<String, StorageError> {
            credentials
                .token
                .clone()
                .ok_or_else(|| StorageError::Serialization("missing token".into()))
        }

        fn decode(&self, encoded: &str) -> Result<Credentials, StorageError> {
            Ok(Credentials::new(encoded))
        }
    }

    #[tokio::test]
    async fn constructor_defaults() {
        let container = Arc::new(MemoryContainer::new());
        let storage = DictionaryStorage::new(Arc::clone(&container), "test-key".to_string(), None);

        assert!(Arc::ptr_eq(storage.container(), &container));
        assert_eq!(storage.key(), "test-key");
        // The stand-in lock tolerates a release without an acquire.
        storage.release_lock().unwrap();
    }

    #[tokio::test]
    async fn constructor_explicit_lock() {
        let container = Arc::new(MemoryContainer::new());
        let lock = Arc::new(SemaphoreLock::new());
        let shared: DynLock = lock.clone();
        let storage = DictionaryStorage::new(container, "test-key".to_string(), Some(shared));

        storage.acquire_lock().await.unwrap();
        assert!(lock.is_held());
        storage.release_lock().unwrap();
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn get_returns_none_then_decodes_stored_value() {
        let credentials = generate_credentials();
        let container = Arc::new(MemoryContainer::new());
        let storage = storage_over(&container);

        assert!(storage.get().await.unwrap().is_none());

        container.insert(
            "credentials".to_string(),
            JsonCredentialCodec.encode(&credentials).unwrap(),
        );
        let returned = storage.get().await.unwrap().expect("stored credentials");

        assert_eq!(returned.token, credentials.token);
        assert_eq!(returned.id_token, credentials.id_token);
        assert_eq!(returned.refresh_token, credentials.refresh_token);
        assert_eq!(returned.client_id, credentials.client_id);
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let credentials = generate_credentials().with_scopes(["email"]);
        let container = Arc::new(MemoryContainer::new());
        let storage = storage_over(&container);

        storage.put(&credentials).await.unwrap();
        let returned = storage.get().await.unwrap();

        assert!(container.contains_key("credentials"));
        assert_eq!(returned, Some(credentials));
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let container = Arc::new(MemoryContainer::new());
        let storage = storage_over(&container);

        storage.put(&Credentials::new("first")).await.unwrap();
        storage.put(&Credentials::new("second")).await.unwrap();

        let returned = storage.get().await.unwrap().unwrap();
        assert_eq!(returned.token.as_deref(), Some("second"));
        assert_eq!(container.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_the_key() {
        let container = Arc::new(MemoryContainer::new());
        let storage = storage_over(&container);

        storage.put(&generate_credentials()).await.unwrap();
        assert!(container.contains_key("credentials"));

        storage.delete().await.unwrap();

        assert!(!container.contains_key("credentials"));
        assert!(storage.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_without_key_leaves_container_untouched() {
        let container = Arc::new(MemoryContainer::new());
        container.insert("other".to_string(), "unrelated".to_string());
        let storage = storage_over(&container);

        storage.delete().await.unwrap();

        assert_eq!(container.len(), 1);
        assert_eq!(
            container.get("other").map(|v| v.value().clone()).as_deref(),
            Some("unrelated")
        );
    }

    #[tokio::test]
    async fn malformed_value_is_a_deserialization_error() {
        let container = Arc::new(MemoryContainer::new());
        container.insert("credentials".to_string(), "{not json".to_string());
        let lock = Arc::new(SemaphoreLock::new());
        let shared: DynLock = lock.clone();
        let storage = DictionaryStorage::new(Arc::clone(&container), "credentials".to_string(), Some(shared));

        let err = storage.get().await.unwrap_err();

        assert!(matches!(err, StorageError::Deserialization(_)));
        assert!(!lock.is_held());
        // The bad value is left for the caller to deal with.
        assert!(container.contains_key("credentials"));
    }

    #[tokio::test]
    async fn acquire_lock_calls_acquire_once() {
        let lock = Arc::new(FakeLock::default());
        let shared: DynLock = lock.clone();
        let storage = DictionaryStorage::new(
            Arc::new(MemoryContainer::new()),
            "credentials".to_string(),
            Some(shared),
        );

        assert_eq!(lock.acquire_count.load(Ordering::SeqCst), 0);
        storage.acquire_lock().await.unwrap();
        assert_eq!(lock.acquire_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_lock_calls_release_once() {
        let lock = Arc::new(FakeLock::default());
        let shared: DynLock = lock.clone();
        let storage = DictionaryStorage::new(
            Arc::new(MemoryContainer::new()),
            "credentials".to_string(),
            Some(shared),
        );

        assert_eq!(lock.release_count.load(Ordering::SeqCst), 0);
        storage.release_lock().unwrap();
        assert_eq!(lock.release_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_codec_controls_the_stored_form() {
        let container = Arc::new(MemoryContainer::new());
        let storage = storage_over(&container).with_codec(Arc::new(TokenOnlyCodec));

        storage.put(&Credentials::new("bare-token")).await.unwrap();

        assert_eq!(
            container.get("credentials").map(|v| v.value().clone()).as_deref(),
            Some("bare-token")
        );
        let returned = storage.get().await.unwrap().unwrap();
        assert_eq!(returned.token.as_deref(), Some("bare-token"));
    }

    #[tokio::test]
    async fn integer_keys_work() {
        let container: Arc<DashMap<u32, String>> = Arc::new(DashMap::new());
        let storage = DictionaryStorage::new(Arc::clone(&container), 42, None);

        storage.put(&generate_credentials()).await.unwrap();

        assert!(container.contains_key(&42u32));
        assert_eq!(
            storage.get().await.unwrap().unwrap().token.as_deref(),
            Some("access_tokenz")
        );
    }
}
