//! Error handling.
//!
//! This module provides:
//! - Error type definitions for every layer (step, oracle, decode, scrape)
//! - Categorization of transport failures
//!
//! Failures are classified here; whether a failure aborts a scrape is decided
//! by the step policy table in the engine, not by the error type.

mod categorization;
mod types;

// Re-export public API
pub use categorization::{body_snippet, step_error_from_reqwest};
pub use types::{
    DecodeError, ErrorType, InitializationError, OracleError, ScrapeError, StepError,
};
