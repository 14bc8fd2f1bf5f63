//! Core types, engines, and trait definitions for the Arbor tree inventory.
//!
//! Storage is reached only through the traits in [`store`]; the SQLite
//! backend and the bundle codec live in their own crates.

// Native `async fn` in traits; the returned futures carry no `Send` bound.
#![allow(async_fn_in_trait)]

pub mod coords;
pub mod error;
pub mod inventory;
pub mod plan;
pub mod risk;
pub mod store;
pub mod tree;

pub use error::{Error, Result};
