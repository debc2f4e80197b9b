//! SQL-backed credential storage (SQLite/Postgres) using SQLx.
//!
//! Each stored credential lives in one row of a table, keyed by a string
//! column, with the encoded credential in another column.

mod storage;

pub use storage::{SqlTarget, SqlxStorage};
