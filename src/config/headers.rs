//! Browser-like request header sets.
//!
//! Header order matters to the backend, so every set is an ordered list of
//! `(name, value)` pairs rather than a map.

/// Accept header of a top-level document navigation
pub const ACCEPT_DOCUMENT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
/// Accept header of JSON API calls
pub const ACCEPT_JSON: &str = "application/json";
/// Accept header of the streamed search call
pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
/// Content type of JSON request bodies
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
/// Content type the telemetry beacon is posted with
pub const CONTENT_TYPE_TEXT: &str = "text/plain;charset=UTF-8";
/// Accept-Language reported by the emulated browser
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
/// Accept-Encoding reported by the emulated browser
pub const ACCEPT_ENCODING: &str = "gzip, deflate, br";

// Context header names
pub const HEADER_COUNTRY: &str = "x-ctx-country";
pub const HEADER_CURRENCY: &str = "x-ctx-currency";
pub const HEADER_LOCALE: &str = "x-ctx-locale";
pub const HEADER_PAGE_ID: &str = "x-ctx-ubt-pageid";
pub const HEADER_PV_ID: &str = "x-ctx-ubt-pvid";
pub const HEADER_SESSION_ID: &str = "x-ctx-ubt-sid";
pub const HEADER_VISITOR_ID: &str = "x-ctx-ubt-vid";
pub const HEADER_USER_RECOGNIZE: &str = "x-ctx-user-recognize";
/// Anti-bot header echoed from the root response
pub const HEADER_ANTI_BOT: &str = "x-ctx-anti-bot";
pub const HEADER_WCLIENT_REQ: &str = "x-ctx-wclient-req";
pub const HEADER_TOKEN: &str = "token";
pub const HEADER_W_PAYLOAD_SOURCE: &str = "w-payload-source";

/// Headers of a top-level document navigation (root and search page visits).
pub fn document_headers() -> Vec<(String, String)> {
    [
        ("accept", ACCEPT_DOCUMENT),
        ("accept-language", ACCEPT_LANGUAGE),
        ("accept-encoding", ACCEPT_ENCODING),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        ("upgrade-insecure-requests", "1"),
        ("cache-control", "max-age=0"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Fetch-metadata headers of same-origin XHR/fetch calls.
pub fn api_headers(accept: &str) -> Vec<(String, String)> {
    [
        ("accept", accept),
        ("accept-language", ACCEPT_LANGUAGE),
        ("accept-encoding", ACCEPT_ENCODING),
        ("content-type", CONTENT_TYPE_JSON),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
        ("priority", "u=1, i"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_headers_are_navigations() {
        let headers = document_headers();
        assert_eq!(headers[0].0, "accept");
        assert!(headers
            .iter()
            .any(|(k, v)| k == "sec-fetch-mode" && v == "navigate"));
    }

    #[test]
    fn test_api_headers_use_given_accept() {
        let headers = api_headers(ACCEPT_EVENT_STREAM);
        assert_eq!(headers[0], ("accept".to_string(), "text/event-stream".to_string()));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "content-type" && v == CONTENT_TYPE_JSON));
    }
}
