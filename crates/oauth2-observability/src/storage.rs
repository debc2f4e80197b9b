use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{field, Instrument};

use oauth2_core::{Credentials, StorageError};
use oauth2_ports::{DynStorage, Lock, Storage};

use crate::metrics::Metrics;

/// A thin wrapper around a `DynStorage` that creates a tracing span (and
/// optionally records metrics) for each storage call.
///
/// Locking stays with the inner storage: the wrapper reports the inner lock
/// and forwards the public operations whole, so the lock is taken once.
pub struct ObservedStorage {
    inner: DynStorage,
    backend: String,
    metrics: Option<Metrics>,
}

impl ObservedStorage {
    pub fn new(inner: DynStorage, backend: String) -> Self {
        Self {
            inner,
            backend,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "credential_storage",
            backend = %self.backend,
            operation,
            outcome = field::Empty
        )
    }

    async fn observe<T, F>(&self, operation: &'static str, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let span = self.span(operation);
        let started = Instant::now();
        let result = call.instrument(span.clone()).await;

        // Never log credential material, only the error class and message.
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => {
                span.in_scope(|| tracing::warn!(error = %err, "credential storage call failed"));
                err.kind()
            }
        };
        span.record("outcome", outcome);

        if let Some(metrics) = &self.metrics {
            metrics.observe(&self.backend, operation, outcome, started.elapsed());
        }

        result
    }
}

#[async_trait]
impl Storage for ObservedStorage {
    fn lock(&self) -> &dyn Lock {
        self.inner.lock()
    }

    async fn init(&self) -> Result<(), StorageError> {
        self.observe("init", self.inner.init()).await
    }

    async fn healthcheck(&self) -> Result<(), StorageError> {
        self.observe("healthcheck", self.inner.healthcheck()).await
    }

    async fn acquire_lock(&self) -> Result<(), StorageError> {
        self.observe("acquire_lock", self.inner.acquire_lock()).await
    }

    fn release_lock(&self) -> Result<(), StorageError> {
        let _entered = self.span("release_lock").entered();
        self.inner.release_lock()
    }

    async fn locked_get(&self) -> Result<Option<Credentials>, StorageError> {
        self.observe("locked_get", self.inner.locked_get()).await
    }

    async fn locked_put(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.observe("locked_put", self.inner.locked_put(credentials))
            .await
    }

    async fn locked_delete(&self) -> Result<(), StorageError> {
        self.observe("locked_delete", self.inner.locked_delete())
            .await
    }

    async fn get(&self) -> Result<Option<Credentials>, StorageError> {
        self.observe("get", self.inner.get()).await
    }

    async fn put(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.observe("put", self.inner.put(credentials)).await
    }

    async fn delete(&self) -> Result<(), StorageError> {
        self.observe("delete", self.inner.delete()).await
    }
}
