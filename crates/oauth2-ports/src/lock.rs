use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use oauth2_core::StorageError;

/// A non-reentrant lock shared by everything that touches one stored credential.
///
/// `release` is synchronous so a [`LockGuard`] can release from `Drop`.
#[async_trait]
pub trait Lock: Send + Sync {
    /// Wait until the lock is available and take it.
    async fn acquire(&self) -> Result<(), StorageError>;

    /// Give the lock back. Releasing a lock that is not held is an error.
    fn release(&self) -> Result<(), StorageError>;
}

pub type DynLock = Arc<dyn Lock>;

/// Stand-in used when a storage is constructed without a lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLock;

impl NoOpLock {
    pub fn shared() -> DynLock {
        Arc::new(Self)
    }
}

#[async_trait]
impl Lock for NoOpLock {
    async fn acquire(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn release(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Task-aware mutual exclusion backed by a single-permit semaphore.
#[derive(Debug)]
pub struct SemaphoreLock {
    permits: Semaphore,
    held: AtomicBool,
}

impl SemaphoreLock {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
            held: AtomicBool::new(false),
        }
    }

    pub fn shared() -> DynLock {
        Arc::new(Self::new())
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Default for SemaphoreLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Lock for SemaphoreLock {
    async fn acquire(&self) -> Result<(), StorageError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StorageError::illegal_state("lock has been closed"))?;
        // The permit is returned by `release`, not by dropping it.
        permit.forget();
        self.held.store(true, Ordering::Release);
        Ok(())
    }

    fn release(&self) -> Result<(), StorageError> {
        if self
            .held
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StorageError::illegal_state("release of an unheld lock"));
        }
        self.permits.add_permits(1);
        Ok(())
    }
}

/// Scoped acquisition of a [`Lock`].
///
/// Call [`LockGuard::release`] to surface release errors. A guard dropped
/// while still held (error unwinding, cancelled future) releases on drop and
/// logs any failure.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a dyn Lock,
    held: bool,
}

impl<'a> LockGuard<'a> {
    pub async fn acquire(lock: &'a dyn Lock) -> Result<LockGuard<'a>, StorageError> {
        lock.acquire().await?;
        Ok(Self { lock, held: true })
    }

    pub fn release(mut self) -> Result<(), StorageError> {
        self.held = false;
        self.lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.held {
            if let Err(err) = self.lock.release() {
                tracing::warn!(error = %err, "failed to release storage lock on drop");
            }
        }
    }
}
