//! Session state and bootstrap.
//!
//! This module provides:
//! - The ordered cookie jar and `Set-Cookie` parsing
//! - The `_combined` / `_bfa` cookie formats
//! - Per-scrape `SessionState` and `BatchContext`
//! - The bootstrap sequencer that fills a session before any API call

mod bootstrap;
mod combined;
mod cookies;
mod state;

// Re-export public API
pub use bootstrap::{bootstrap, Bootstrapped};
pub use combined::{bfa_cookie, normalize_marker, transaction_id_at, CombinedCookie};
pub use cookies::{parse_set_cookie, CookieJar};
pub use state::{BatchContext, ContextHeaders, FingerprintTokens, SessionState};
