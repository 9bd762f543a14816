//! Persistence layer: restricted-area catalog overlay and durable audit
//! sink. Every failure here is survivable; the safety-decision path falls
//! back to in-memory state.

pub mod areas;
pub mod audit;
mod db;

pub use db::{init_database, Database};
