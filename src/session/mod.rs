//! Study sessions
//!
//! This module provides:
//! - The per-card interaction state machine (answer, reveal, assess)
//! - Review and Practice session modes
//! - The [`SessionManager`] facade the UI drives

pub mod manager;
pub mod models;

pub use manager::{SessionError, SessionManager};
pub use models::*;
