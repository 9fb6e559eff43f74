//! Logger initialization.
//!
//! The library only logs through the `log` facade; the binary installs this
//! `env_logger` backend. Plain output is coloured for terminals, JSON output
//! is one object per line for log shippers.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};
use serde_json::json;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Dependencies that are chatty below these levels.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
    ("h2", LevelFilter::Info),
    ("html5ever", LevelFilter::Error),
    ("selectors", LevelFilter::Warn),
];

/// Initializes the logger with the specified level and format.
///
/// `RUST_LOG` is read first; `level` then overrides it for this crate and as
/// the global default.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Stage-by-stage trace of one scrape
/// RUST_LOG=flight_scout::engine=debug flight_scout "$URL"
///
/// # Machine-readable logs on stderr, JSON envelope on stdout
/// flight_scout "$URL" --log-format json 2>scrape.log
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, filter) in QUIET_MODULES {
        builder.filter_module(module, (*filter).min(level));
    }
    builder.filter_module("flight_scout", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{}",
                    json_line(
                        chrono::Utc::now().timestamp_millis(),
                        record.level(),
                        record.target(),
                        &record.args().to_string(),
                    )
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    Level::Error => level.to_string().red(),
                    Level::Warn => level.to_string().yellow(),
                    Level::Info => level.to_string().green(),
                    Level::Debug => level.to_string().blue(),
                    Level::Trace => level.to_string().purple(),
                };
                let marker = match level {
                    Level::Error => "❌",
                    Level::Warn => "⚠️",
                    Level::Info => "✔️",
                    Level::Debug => "🔍",
                    Level::Trace => "🔬",
                };
                writeln!(
                    buf,
                    "{} {} {} [{}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    marker,
                    short_target(record.target()).cyan(),
                    colored_level,
                    record.args()
                )
            });
        }
    }

    // try_init: a second install (tests, embedding apps) is an error, not a panic
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

/// `flight_scout::engine::stages` logs as `engine::stages`.
fn short_target(target: &str) -> &str {
    target
        .strip_prefix("flight_scout::")
        .unwrap_or(target)
}

fn json_line(ts_millis: i64, level: Level, target: &str, message: &str) -> String {
    json!({
        "ts": ts_millis,
        "level": level.as_str(),
        "target": target,
        "msg": message,
    })
    .to_string()
}
