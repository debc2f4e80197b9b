//! Library exports.
//!
//! The storage contract, the backends and their ambient pieces live in the
//! extracted `oauth2-*` crates; this façade re-exports them under one roof so
//! applications depend on a single crate.

pub mod config;
pub mod storage;
pub mod telemetry;

pub use oauth2_core::{
    CredentialCodec, Credentials, DynCodec, JsonCredentialCodec, StorageError, GOOGLE_TOKEN_URI,
};
pub use oauth2_ports::{
    Container, DynLock, Lock, LockGuard, MemoryContainer, NoOpLock, SemaphoreLock,
};
pub use oauth2_config::{ClientConfig, Config, StorageConfig};
pub use oauth2_observability::Metrics;
