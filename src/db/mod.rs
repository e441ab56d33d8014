//! Database module for UpTrail.
//!
//! Provides SQLite storage for check history.

mod models;
mod store;

pub use models::*;
pub use store::*;
