//! Step names, the failure policy table, and per-step outcomes.

use log::warn;
use serde::{Serialize, Serializer};
use strum_macros::EnumIter;

use crate::error_handling::StepError;
use crate::transport::HttpResponse;

/// Every call a scrape can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum StepName {
    RootVisit,
    CreateClientId,
    SearchPageVisit,
    AppConfig,
    HeaderInfo,
    SaveLog,
    RouteInfo,
    RouteInfoRefresh,
    TelemetryCollect,
    /// Initial search, event-stream variant
    SearchStream,
    /// Sort/refine search, plain JSON variant
    Search,
    LegacyMetrics,
    Fingerprint,
    Risk,
}

/// Whether a failed step aborts the scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Mandatory,
    BestEffort,
}

impl StepName {
    /// Wire-facing name, as reported in outcomes and failure messages.
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::RootVisit => "root",
            StepName::CreateClientId => "createclientid",
            StepName::SearchPageVisit => "searchPage",
            StepName::AppConfig => "getAppConfig",
            StepName::HeaderInfo => "getHeaderInfo",
            StepName::SaveLog => "saveLogInfo",
            StepName::RouteInfo => "GetRouteInfo",
            StepName::RouteInfoRefresh => "GetRouteInfo#2",
            StepName::TelemetryCollect => "collect",
            StepName::SearchStream => "FlightListSearchSSE",
            StepName::Search => "FlightListSearch",
            StepName::LegacyMetrics => "clog",
            StepName::Fingerprint => "getRiskFingerprint",
            StepName::Risk => "reportRisk",
        }
    }

    /// The policy table. Only the search page visit and the main search are
    /// mandatory.
    pub fn policy(self) -> StepPolicy {
        match self {
            StepName::SearchPageVisit | StepName::SearchStream | StepName::Search => {
                StepPolicy::Mandatory
            }
            _ => StepPolicy::BestEffort,
        }
    }

    pub fn is_mandatory(self) -> bool {
        self.policy() == StepPolicy::Mandatory
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of one orchestrated call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub step: StepName,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn from_result(step: StepName, result: &Result<HttpResponse, StepError>) -> Self {
        match result {
            Ok(response) => Self {
                step,
                success: true,
                status: Some(response.status),
                error: None,
            },
            Err(e) => Self {
                step,
                success: false,
                status: e.status(),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn failed(step: StepName, error: &StepError) -> Self {
        Self {
            step,
            success: false,
            status: error.status(),
            error: Some(error.to_string()),
        }
    }
}

/// Ordered outcome log of one scrape.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    outcomes: Vec<RequestOutcome>,
}

impl StepReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call's outcome; best-effort failures are logged as degraded.
    pub fn record(&mut self, step: StepName, result: &Result<HttpResponse, StepError>) {
        self.push(RequestOutcome::from_result(step, result));
    }

    pub fn push(&mut self, outcome: RequestOutcome) {
        if !outcome.success && !outcome.step.is_mandatory() {
            warn!(
                "{} failed, continuing: {}",
                outcome.step,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[RequestOutcome] {
        &self.outcomes
    }

    pub fn get(&self, step: StepName) -> Option<&RequestOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    pub fn into_outcomes(self) -> Vec<RequestOutcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorType;
    use strum::IntoEnumIterator;

    #[test]
    fn test_policy_table() {
        let mandatory: Vec<StepName> = StepName::iter().filter(|s| s.is_mandatory()).collect();
        assert_eq!(
            mandatory,
            vec![
                StepName::SearchPageVisit,
                StepName::SearchStream,
                StepName::Search
            ]
        );
    }

    #[test]
    fn test_step_names_are_unique() {
        let mut names: Vec<&str> = StepName::iter().map(StepName::as_str).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_outcome_from_results() {
        let ok = RequestOutcome::from_result(StepName::AppConfig, &Ok(HttpResponse::new(200, "{}")));
        assert!(ok.success);
        assert_eq!(ok.status, Some(200));

        let err = RequestOutcome::from_result(
            StepName::TelemetryCollect,
            &Err(StepError::Transport {
                kind: ErrorType::HttpRequestConnectError,
                message: "refused".to_string(),
            }),
        );
        assert!(!err.success);
        assert_eq!(err.status, None);
        assert_eq!(
            serde_json::to_value(&err).expect("serializable")["step"],
            "collect"
        );
    }

    #[test]
    fn test_report_keeps_order() {
        let mut report = StepReport::new();
        report.record(StepName::RootVisit, &Ok(HttpResponse::new(200, "")));
        report.push(RequestOutcome::failed(
            StepName::CreateClientId,
            &StepError::Status {
                status: 500,
                snippet: String::new(),
            },
        ));
        let steps: Vec<StepName> = report.outcomes().iter().map(|o| o.step).collect();
        assert_eq!(steps, vec![StepName::RootVisit, StepName::CreateClientId]);
        assert_eq!(report.get(StepName::CreateClientId).and_then(|o| o.status), Some(500));
    }
}
