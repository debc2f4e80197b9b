pub use oauth2_storage_factory::{
    create_observed_storage, create_storage, DynLock, DynStorage, ObservedStorage, Storage,
};

/// Backward-compatible module path for the dictionary adapter.
pub use oauth2_storage_factory::dict;

/// Backward-compatible module path for the SQLx adapter.
pub use oauth2_storage_factory::sqlx;

use oauth2_config::Config;
use oauth2_core::StorageError;

/// Validate `config` and build the storage it describes.
///
/// The sanitized configuration is logged; secrets never reach the log.
pub async fn open_storage(
    config: &Config,
    lock: Option<DynLock>,
) -> Result<DynStorage, StorageError> {
    config.validate().map_err(StorageError::Config)?;
    tracing::info!(config = ?config.sanitized(), "opening credential storage");
    create_storage(&config.storage, lock).await
}
