use thiserror::Error;

/// Everything that can go wrong while storing or loading a credential.
///
/// A missing credential is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A locked primitive was called on a storage that does not provide it.
    #[error("{operation} is not implemented by this storage")]
    NotImplemented { operation: &'static str },

    /// The lock was used out of order (e.g. released while not held).
    #[error("illegal lock state: {0}")]
    IllegalState(String),

    /// Stored data could not be turned back into credentials.
    #[error("failed to deserialize stored credentials: {0}")]
    Deserialization(String),

    #[error("failed to serialize credentials: {0}")]
    Serialization(String),

    /// The key-value container backing a storage failed.
    #[error("container error: {0}")]
    Container(String),

    /// The database backing a storage failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    pub fn illegal_state(description: &str) -> Self {
        Self::IllegalState(description.to_string())
    }

    pub fn deserialization(description: impl ToString) -> Self {
        Self::Deserialization(description.to_string())
    }

    pub fn config(description: &str) -> Self {
        Self::Config(description.to_string())
    }

    /// Stable label used for metrics and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotImplemented { .. } => "not_implemented",
            Self::IllegalState(_) => "illegal_state",
            Self::Deserialization(_) => "deserialization",
            Self::Serialization(_) => "serialization",
            Self::Container(_) => "container",
            Self::Backend(_) => "backend",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
