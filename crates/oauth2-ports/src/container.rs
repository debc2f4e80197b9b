use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use dashmap::DashMap;

use oauth2_core::StorageError;

/// A key-value store that holds encoded credentials, e.g. a session.
///
/// The container belongs to the caller; storages only read, overwrite and
/// remove their own key.
pub trait Container: Send + Sync {
    type Key: Send + Sync;

    fn get_value(&self, key: &Self::Key) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing whatever was there.
    fn set_value(&self, key: &Self::Key, value: String) -> Result<(), StorageError>;

    /// Remove `key`. A missing key is not an error.
    fn remove_value(&self, key: &Self::Key) -> Result<(), StorageError>;

    fn contains_key(&self, key: &Self::Key) -> Result<bool, StorageError> {
        Ok(self.get_value(key)?.is_some())
    }
}

/// Default in-process container.
pub type MemoryContainer = DashMap<String, String>;

impl<K> Container for DashMap<K, String>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    type Key = K;

    fn get_value(&self, key: &K) -> Result<Option<String>, StorageError> {
        Ok(self.get(key).map(|entry| entry.value().clone()))
    }

    fn set_value(&self, key: &K, value: String) -> Result<(), StorageError> {
        self.insert(key.clone(), value);
        Ok(())
    }

    fn remove_value(&self, key: &K) -> Result<(), StorageError> {
        self.remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        Ok(DashMap::contains_key(self, key))
    }
}

fn poisoned() -> StorageError {
    StorageError::Container("container lock poisoned".to_string())
}

impl<K> Container for RwLock<HashMap<K, String>>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    type Key = K;

    fn get_value(&self, key: &K) -> Result<Option<String>, StorageError> {
        let map = self.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set_value(&self, key: &K, value: String) -> Result<(), StorageError> {
        let mut map = self.write().map_err(|_| poisoned())?;
        map.insert(key.clone(), value);
        Ok(())
    }

    fn remove_value(&self, key: &K) -> Result<(), StorageError> {
        let mut map = self.write().map_err(|_| poisoned())?;
        map.remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        let map = self.read().map_err(|_| poisoned())?;
        Ok(map.contains_key(key))
    }
}
