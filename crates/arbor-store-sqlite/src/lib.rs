//! SQLite backend for the Arbor tree inventory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] serves as both the
//! record snapshot ([`arbor_core::store::InventoryBackend`]) and the photo
//! blob store ([`arbor_core::store::PhotoStore`]).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
