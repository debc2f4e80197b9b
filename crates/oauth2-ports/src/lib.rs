//! Integration ports for the credential store.
//!
//! Implement these traits in your own crate to plug in custom persistence,
//! locking or key-value containers without forking.

pub mod container;
pub mod lock;
pub mod storage;

pub use container::*;
pub use lock::*;
pub use storage::*;
