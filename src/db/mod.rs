//! Database module for Upwatch.
//!
//! Provides SQLite storage for the endpoint registry, the append-only check
//! log and the derived endpoint summaries.

mod models;
mod store;

pub use models::*;
pub use store::*;
