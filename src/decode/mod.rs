//! Search response decoding.
//!
//! This module provides:
//! - Content-Encoding decompression (gzip, deflate, brotli)
//! - Event-stream framing with a per-variant first/last selection rule
//! - Extraction of the `basicInfo` facts and the blocked-result heuristic

mod decompress;
mod sse;

use log::warn;
use serde_json::Value;

use crate::config::BLOCKED_RECORD_COUNT;
use crate::error_handling::DecodeError;
use crate::transport::HttpResponse;

pub use decompress::decompress;
pub use sse::{data_lines, has_data_lines, parse_events, select_data, SseEvent, SseSelection};

/// A decoded main-search body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSearch {
    pub body: Value,
    /// `basicInfo.recordCount`
    pub record_count: Option<u64>,
    /// `basicInfo.productId`
    pub product_id: Option<String>,
    /// The backend answered with a single record, which is what a challenged
    /// request gets. Low confidence; not an error.
    pub blocked: bool,
    /// Every event of an event-stream body; empty for plain JSON
    pub events: Vec<SseEvent>,
}

impl DecodedSearch {
    fn from_body(body: Value, events: Vec<SseEvent>) -> Self {
        let basic_info = body.get("basicInfo");
        let record_count = basic_info
            .and_then(|info| info.get("recordCount"))
            .and_then(Value::as_u64);
        let product_id = basic_info
            .and_then(|info| info.get("productId"))
            .and_then(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Self {
            blocked: record_count == Some(BLOCKED_RECORD_COUNT),
            body,
            record_count,
            product_id,
            events,
        }
    }
}

/// Decompressed response body as UTF-8 text.
pub fn response_text(response: &HttpResponse) -> Result<String, DecodeError> {
    let bytes = decompress(&response.body, response.header("content-encoding"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Decodes a main-search response.
///
/// Bodies with `data:` lines are event streams and yield the JSON of the
/// line chosen by `selection`; anything else is parsed as one JSON document.
pub fn decode_search_response(
    response: &HttpResponse,
    selection: SseSelection,
) -> Result<DecodedSearch, DecodeError> {
    let text = response_text(response)?;

    let (body, events) = if has_data_lines(&text) {
        let body = select_data(&text, selection).ok_or(DecodeError::EmptyStream)?;
        (body, parse_events(&text))
    } else {
        (serde_json::from_str(text.trim())?, Vec::new())
    };

    let decoded = DecodedSearch::from_body(body, events);
    if decoded.blocked {
        warn!("Search answered with a single record; the request was probably challenged");
    }
    Ok(decoded)
}
