//! Configuration types.
//!
//! This module defines the explicit configuration value handed to the engine.
//! Nothing here is global: two scrapes with different configs never interfere.

use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_USER_AGENT, PATH_APP_CONFIG, PATH_CREATE_CLIENT_ID, PATH_HEADER_INFO,
    PATH_ROUTE_INFO, PATH_SAVE_LOG, PATH_SEARCH, PATH_SEARCH_SSE, RENDER_DELAY_MAX_MS,
    RENDER_DELAY_MIN_MS, REQUEST_TIMEOUT_SECS, STAGE_A_SPACING, URL_FINGERPRINT,
    URL_LEGACY_METRICS, URL_RISK, URL_TELEMETRY_COLLECT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Where each consumed endpoint lives.
///
/// Values starting with `/` are resolved against the origin of the search URL;
/// anything else must be an absolute URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub create_client_id: String,
    pub app_config: String,
    pub header_info: String,
    pub save_log: String,
    pub route_info: String,
    pub search_sse: String,
    pub search: String,
    pub telemetry_collect: String,
    pub legacy_metrics: String,
    pub fingerprint: String,
    pub risk: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            create_client_id: PATH_CREATE_CLIENT_ID.to_string(),
            app_config: PATH_APP_CONFIG.to_string(),
            header_info: PATH_HEADER_INFO.to_string(),
            save_log: PATH_SAVE_LOG.to_string(),
            route_info: PATH_ROUTE_INFO.to_string(),
            search_sse: PATH_SEARCH_SSE.to_string(),
            search: PATH_SEARCH.to_string(),
            telemetry_collect: URL_TELEMETRY_COLLECT.to_string(),
            legacy_metrics: URL_LEGACY_METRICS.to_string(),
            fingerprint: URL_FINGERPRINT.to_string(),
            risk: URL_RISK.to_string(),
        }
    }
}

impl Endpoints {
    /// Resolves `endpoint` against `origin` (`scheme://host[:port]`).
    pub fn resolve(origin: &str, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", origin.trim_end_matches('/'), endpoint)
        } else {
            endpoint.to_string()
        }
    }

    /// Every endpoint on the search URL's own host.
    ///
    /// Used when the collector and security hosts are served by the same
    /// origin (mock servers, local relays).
    pub fn same_origin() -> Self {
        Self {
            telemetry_collect: "/bee/collect".to_string(),
            legacy_metrics: "/bee/clog".to_string(),
            fingerprint: "/rp/getRiskFingerprint".to_string(),
            risk: "/rp/reportRisk".to_string(),
            ..Self::default()
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use flight_scout::Config;
///
/// let config = Config {
///     enable_legacy_metrics: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Proxy URL applied to every call of a scrape
    pub proxy: Option<String>,

    /// Sleep between calls the way the front-end does (disable for tests)
    pub pacing: bool,

    /// Spacing between Stage A calls when the transport cannot pipeline
    pub stage_a_spacing: Duration,

    /// Bounds of the simulated page-render delay, in milliseconds
    pub render_delay_ms: (u64, u64),

    /// Send the legacy metrics ("clog") call alongside the search
    pub enable_legacy_metrics: bool,

    /// Include response snippets and error chains in failure messages
    pub debug: bool,

    /// Endpoint table
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: REQUEST_TIMEOUT_SECS,
            proxy: None,
            pacing: true,
            stage_a_spacing: STAGE_A_SPACING,
            render_delay_ms: (RENDER_DELAY_MIN_MS, RENDER_DELAY_MAX_MS),
            enable_legacy_metrics: false,
            debug: false,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Configuration with pacing disabled, for tests and local replays.
    pub fn unpaced() -> Self {
        Self {
            pacing: false,
            ..Self::default()
        }
    }
}
