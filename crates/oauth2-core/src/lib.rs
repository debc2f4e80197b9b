//! Framework-agnostic credential types and helpers.
//!
//! This crate holds the pieces every storage backend shares: the
//! [`Credentials`] value, the [`CredentialCodec`] used to persist it and the
//! [`StorageError`] taxonomy.

pub mod codec;
pub mod models;

pub use codec::*;
pub use models::*;
