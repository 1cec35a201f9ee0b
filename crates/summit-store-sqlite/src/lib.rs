//! SQLite backend for the Summit base table store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::CURRENT_SCHEMA_VERSION;
pub use store::SqliteStore;
