//! Application configuration and constants.
//!
//! This module provides:
//! - Protocol constants (identifiers, markers, endpoint paths, codec parameters)
//! - Ordered browser header sets
//! - The explicit `Config` value passed into the engine

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{Config, Endpoints, LogFormat, LogLevel};
