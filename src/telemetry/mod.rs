//! UBT telemetry.
//!
//! This module provides:
//! - The text codec the collector expects
//! - The telemetry payload builder
//! - The collector request body

mod codec;
mod payload;

use serde_json::json;

use crate::config::TELEMETRY_FORMAT_TAG;

pub use codec::{encode, encode_str};
pub use payload::{build_telemetry_payload, TelemetryInput, TelemetryPayload, UbtEvent};

/// `{"d":"f00{sendTs}!m1Legacy!{encoded}"}`
pub fn collect_body(payload: &TelemetryPayload) -> Result<String, serde_json::Error> {
    let encoded = encode(payload)?;
    let d = format!("f00{}{TELEMETRY_FORMAT_TAG}{encoded}", payload.send_ts);
    serde_json::to_string(&json!({ "d": d }))
}
