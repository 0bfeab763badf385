//! Card store and review history
//!
//! This module provides:
//! - The card data model with its SM-2 scheduling state
//! - The bounded per-card review history ring
//! - JSON-backed storage keyed by (curriculum, study-unit)

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{CardStore, StoreError, SESSION_RETENTION};
