//! Scrape results and the serialisable response envelope.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::outcome::{RequestOutcome, StepName};
use crate::decode::{DecodedSearch, SseEvent};
use crate::error_handling::ScrapeError;
use crate::parse::ParsedUrlData;
use crate::payload::{SearchOptions, SortSpec};
use crate::session::{BatchContext, SessionState};

/// Request metadata echoed back with a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEcho {
    pub url: String,
    pub hostname: String,
    pub region: String,
    /// Search step that produced the data
    pub variant: StepName,
    pub batch_id: String,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl RequestEcho {
    pub(crate) fn new(
        parsed: &ParsedUrlData,
        options: &SearchOptions,
        variant: StepName,
        session: &SessionState,
        batch: &BatchContext,
    ) -> Self {
        Self {
            url: parsed.url.clone(),
            hostname: parsed.hostname.clone(),
            region: parsed.region.clone(),
            variant,
            batch_id: batch.batch_id.clone(),
            transaction_id: session.transaction_id.clone(),
            product_id: options.product_id.clone(),
            sort: options.sort.clone(),
        }
    }
}

/// Outcome of a successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchResult {
    /// HTTP status of the main search
    pub status: u16,
    /// Decoded search body
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Low-confidence flag: the backend answered the way it answers
    /// challenged requests
    pub blocked: bool,
    /// Diagnostic subset of the session's cookies
    pub cookies: BTreeMap<String, String>,
    /// Every event of a streamed answer; debug mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SseEvent>>,
    pub request: RequestEcho,
    /// Every call made, in order
    #[serde(skip)]
    pub steps: Vec<RequestOutcome>,
}

impl FlightSearchResult {
    pub(crate) fn new(
        status: u16,
        decoded: DecodedSearch,
        session: &SessionState,
        request: RequestEcho,
        keep_events: bool,
    ) -> Self {
        Self {
            status,
            data: decoded.body,
            record_count: decoded.record_count,
            product_id: decoded.product_id,
            blocked: decoded.blocked,
            cookies: session.diagnostic_cookies(),
            events: keep_events.then_some(decoded.events),
            request,
            steps: Vec::new(),
        }
    }
}

/// What the CLI or an HTTP front-end hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FlightSearchResult>,
    pub steps: Vec<RequestOutcome>,
}

impl ScrapeResponse {
    pub fn from_result(
        result: Result<FlightSearchResult, ScrapeError>,
        steps: Vec<RequestOutcome>,
    ) -> Self {
        match result {
            Ok(result) => {
                let message = if result.blocked {
                    "Search completed; single-record response, possibly blocked".to_string()
                } else {
                    format!(
                        "Search completed with {} records",
                        result.record_count.unwrap_or_default()
                    )
                };
                Self {
                    success: true,
                    message,
                    result: Some(result),
                    steps,
                }
            }
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                result: None,
                steps,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::fixtures::{batch, parsed, session, ROUND_TRIP_URL};
    use serde_json::json;

    fn result(blocked: bool) -> FlightSearchResult {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let echo = RequestEcho::new(
            &parsed,
            &SearchOptions::default(),
            StepName::SearchStream,
            &session,
            &batch(),
        );
        let decoded = DecodedSearch {
            body: json!({"basicInfo": {"recordCount": if blocked { 1 } else { 42 }}}),
            record_count: Some(if blocked { 1 } else { 42 }),
            product_id: None,
            blocked,
            events: Vec::new(),
        };
        FlightSearchResult::new(200, decoded, &session, echo, false)
    }

    #[test]
    fn test_result_serialization() {
        let value = serde_json::to_value(result(false)).expect("serializable");
        assert_eq!(value["status"], 200);
        assert_eq!(value["recordCount"], 42);
        assert!(value.get("productId").is_none());
        assert!(value.get("steps").is_none());
        assert!(value.get("events").is_none());
        assert_eq!(value["request"]["variant"], "FlightListSearchSSE");
        assert_eq!(value["request"]["region"], "id");
        assert_eq!(value["cookies"]["GUID"], "09031234567890");
    }

    #[test]
    fn test_envelope_messages() {
        let ok = ScrapeResponse::from_result(Ok(result(false)), Vec::new());
        assert!(ok.success);
        assert_eq!(ok.message, "Search completed with 42 records");

        let blocked = ScrapeResponse::from_result(Ok(result(true)), Vec::new());
        assert!(blocked.success);
        assert!(blocked.message.contains("possibly blocked"));

        let failed = ScrapeResponse::from_result(
            Err(ScrapeError::FatalSearch {
                step: "FlightListSearchSSE".to_string(),
                detail: "HTTP 502".to_string(),
            }),
            vec![RequestOutcome {
                step: StepName::SearchStream,
                success: false,
                status: Some(502),
                error: Some("HTTP 502".to_string()),
            }],
        );
        assert!(!failed.success);
        assert!(failed.message.contains("FlightListSearchSSE"));
        let value = serde_json::to_value(&failed).expect("serializable");
        assert!(value.get("result").is_none());
        assert_eq!(value["steps"][0]["step"], "FlightListSearchSSE");
    }
}
