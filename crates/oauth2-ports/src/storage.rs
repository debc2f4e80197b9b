use async_trait::async_trait;
use std::sync::Arc;

use oauth2_core::{Credentials, StorageError};

use crate::lock::{Lock, LockGuard, NoOpLock};

/// Store and retrieve a single credential.
///
/// Implementations provide the `locked_*` primitives; the public
/// [`get`](Storage::get), [`put`](Storage::put) and [`delete`](Storage::delete)
/// wrap them in the storage lock so that everyone sharing that lock sees the
/// credential change one operation at a time.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The lock guarding this storage. Storages built without one use [`NoOpLock`].
    fn lock(&self) -> &dyn Lock {
        &NoOpLock
    }

    /// Prepare the backing store (e.g. create the table).
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Lightweight liveness/readiness check.
    async fn healthcheck(&self) -> Result<(), StorageError> {
        self.init().await
    }

    /// Take the storage lock. The lock is not reentrant.
    async fn acquire_lock(&self) -> Result<(), StorageError> {
        self.lock().acquire().await
    }

    /// Give the storage lock back; errors if it is not held.
    fn release_lock(&self) -> Result<(), StorageError> {
        self.lock().release()
    }

    /// Read the credential. The storage lock must be held.
    async fn locked_get(&self) -> Result<Option<Credentials>, StorageError> {
        Err(StorageError::not_implemented("locked_get"))
    }

    /// Write the credential. The storage lock must be held.
    async fn locked_put(&self, _credentials: &Credentials) -> Result<(), StorageError> {
        Err(StorageError::not_implemented("locked_put"))
    }

    /// Remove the credential. The storage lock must be held.
    async fn locked_delete(&self) -> Result<(), StorageError> {
        Err(StorageError::not_implemented("locked_delete"))
    }

    /// Read the credential. The storage lock must *not* be held.
    async fn get(&self) -> Result<Option<Credentials>, StorageError> {
        let guard = LockGuard::acquire(self.lock()).await?;
        let result = self.locked_get().await;
        guard.release()?;
        result
    }

    /// Write the credential. The storage lock must *not* be held.
    async fn put(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let guard = LockGuard::acquire(self.lock()).await?;
        let result = self.locked_put(credentials).await;
        guard.release()?;
        result
    }

    /// Remove the credential. The storage lock must *not* be held.
    async fn delete(&self) -> Result<(), StorageError> {
        let guard = LockGuard::acquire(self.lock()).await?;
        let result = self.locked_delete().await;
        guard.release()?;
        result
    }
}

pub type DynStorage = Arc<dyn Storage>;
