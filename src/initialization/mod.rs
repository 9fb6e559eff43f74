//! Process-level initialization.
//!
//! This module provides:
//! - Logger setup (plain or JSON)
//! - The `reqwest` client behind the default transport
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
