//! Error categorization.
//!
//! This module turns transport failures and bad responses into `StepError`s.

use super::types::{ErrorType, StepError};
use crate::config::MAX_BODY_SNIPPET_CHARS;

/// Categorizes a `reqwest::Error` into an `ErrorType`.
///
/// Status errors never reach this function: the transport hands every
/// response back and status policy is applied per step.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_redirect() {
        ErrorType::HttpRequestRedirectError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_request() {
        ErrorType::HttpRequestRequestError
    } else if error.is_body() {
        ErrorType::HttpRequestBodyError
    } else if error.is_decode() {
        ErrorType::HttpRequestDecodeError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

/// Wraps a `reqwest::Error` as a transport-level step failure.
pub fn step_error_from_reqwest(error: &reqwest::Error) -> StepError {
    StepError::Transport {
        kind: categorize_reqwest_error(error),
        message: error.to_string(),
    }
}

/// Truncates a response body to a loggable preview.
pub fn body_snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > MAX_BODY_SNIPPET_CHARS {
        let mut snippet: String = text.chars().take(MAX_BODY_SNIPPET_CHARS).collect();
        snippet.push_str("...");
        snippet
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_snippet_short_body_unchanged() {
        assert_eq!(body_snippet(b"{\"ok\":true}"), "{\"ok\":true}");
    }

    #[test]
    fn test_body_snippet_truncates_long_body() {
        let body = "x".repeat(MAX_BODY_SNIPPET_CHARS + 10);
        let snippet = body_snippet(body.as_bytes());
        assert_eq!(snippet.len(), MAX_BODY_SNIPPET_CHARS + 3);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_body_snippet_lossy_on_invalid_utf8() {
        let snippet = body_snippet(&[0xff, b'a']);
        assert!(snippet.ends_with('a'));
    }

    #[tokio::test]
    async fn test_categorize_connect_error() {
        // Port 9 on localhost is closed on any sane test host
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("nothing listens on the discard port");
        let kind = categorize_reqwest_error(&err);
        assert!(
            matches!(
                kind,
                ErrorType::HttpRequestConnectError | ErrorType::HttpRequestRequestError
            ),
            "unexpected category {kind:?}"
        );
    }
}
