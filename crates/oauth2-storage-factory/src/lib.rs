//! Storage backend selection for the credential store.
//!
//! This crate centralizes URL-based backend selection (in-memory container vs
//! SQLx) and wraps the chosen implementation with `ObservedStorage` for tracing.

use std::sync::Arc;

use oauth2_config::StorageConfig;
use oauth2_core::StorageError;

pub use oauth2_observability::{Metrics, ObservedStorage};
pub use oauth2_ports::{DynLock, DynStorage, Storage};

/// Backward-compatible module path for the dictionary adapter.
pub mod dict {
    pub use oauth2_storage_dict::DictionaryStorage;
}

/// Backward-compatible module path for the SQLx adapter.
pub mod sqlx {
    pub use oauth2_storage_sqlx::{SqlTarget, SqlxStorage};
}

/// Create a storage backend based on URL scheme.
///
/// Supported:
/// - `memory:` -> `DictionaryStorage` over a fresh in-process container
/// - `postgres://...`, `postgresql://...` and `sqlite:...` -> SQLx backend (table created if missing)
///
/// `lock`, when given, guards every call on the returned storage.
pub async fn create_storage(
    config: &StorageConfig,
    lock: Option<DynLock>,
) -> Result<DynStorage, StorageError> {
    create_observed_storage(config, lock, None).await
}

/// Like [`create_storage`], additionally recording per-call metrics.
pub async fn create_observed_storage(
    config: &StorageConfig,
    lock: Option<DynLock>,
    metrics: Option<Metrics>,
) -> Result<DynStorage, StorageError> {
    let url = config.url.as_str();

    let (inner, backend): (DynStorage, &str) = if url == "memory:" {
        let container = Arc::new(oauth2_ports::MemoryContainer::new());
        let storage = dict::DictionaryStorage::new(container, config.key.clone(), lock);
        (Arc::new(storage), "memory")
    } else if url.starts_with("postgres://")
        || url.starts_with("postgresql://")
        || url.starts_with("sqlite:")
    {
        let target = sqlx::SqlTarget::new(
            config.table.as_str(),
            config.key_column.as_str(),
            config.credential_column.as_str(),
        )?;
        let storage = sqlx::SqlxStorage::new(url, target, config.key.clone(), lock).await?;
        storage.init().await?;
        let backend = storage.backend_name();
        (Arc::new(storage), backend)
    } else {
        return Err(StorageError::Config(format!(
            "unsupported storage url `{url}` (expected memory:, sqlite: or postgres://)"
        )));
    };

    tracing::info!(backend, "credential storage created");

    let mut observed = ObservedStorage::new(inner, backend.to_string());
    if let Some(metrics) = metrics {
        observed = observed.with_metrics(metrics);
    }
    Ok(Arc::new(observed))
}
