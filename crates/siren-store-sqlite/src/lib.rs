//! SQLite backend for the Siren dispatch store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-row invariant (one
//! assignment per rider, one location per owner, one media session per rider)
//! is enforced by a UNIQUE key and written with a single upsert statement.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
