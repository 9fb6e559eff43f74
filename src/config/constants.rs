//! Configuration constants.
//!
//! This module defines the fixed protocol values the front-end emits verbatim:
//! identifiers, markers, endpoint paths, codec parameters, and pacing delays.

use std::time::Duration;

// Network operation timeouts
/// Per-request timeout in seconds (transport default)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent string for HTTP requests.
///
/// Sent on every call, and reported to the w-payload-source oracle as the
/// negotiated client identity. Users can override this via `--user-agent`.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Session identity
/// Page id the list page reports when the site did not assign one
pub const DEFAULT_PAGE_ID: &str = "10320667452";
/// Application id carried in request heads
pub const APP_ID: &str = "700020";
/// Telemetry application id
pub const CAPTAIN_APP_ID: &str = "100014851";
/// Prefix of every transaction id (`1-mf-{yyyyMMddHHmmssSSS}-WEB`)
pub const TRANSACTION_ID_PREFIX: &str = "1-mf-";
/// Marker the production front-end ends transaction ids with
pub const PRODUCTION_TRANSACTION_MARKER: &str = "-WEB";
/// Placeholder marker older page builds put inside `_combined`
pub const LEGACY_TRANSACTION_MARKER: &str = "-H5";
/// Value of `x-ctx-user-recognize` outside the EU
pub const USER_RECOGNIZE_NON_EU: &str = "NON_EU";
/// Milliseconds between the two `_bfa` timestamps
pub const BFA_SPAN_MS: i64 = 20_000;
/// Length of generated client ids
pub const CLIENT_ID_DIGITS: usize = 14;
/// Length of the random suffix of generated visitor ids
pub const VISITOR_SUFFIX_LEN: usize = 12;

// Cookie names
pub const COOKIE_CLIENT_ID: &str = "GUID";
pub const COOKIE_VISITOR_ID: &str = "UBT_VID";
pub const COOKIE_COMBINED: &str = "_combined";
pub const COOKIE_BFA: &str = "_bfa";
pub const COOKIE_TEST_BUCKET: &str = "_abtest_userid";
pub const COOKIE_RGUID: &str = "_RGUID";
pub const COOKIE_RF1: &str = "_RF1";
pub const COOKIE_RSG: &str = "_RSG";
pub const COOKIE_RDG: &str = "_RDG";

/// Tracking cookies carried forward from the root visit when present.
pub const TRACKING_COOKIES: &[&str] = &[
    "ibusite",
    "ibugroup",
    "ibu_country",
    "ibu_cookie_strict",
    "ibulanguage",
    "ibulocale",
    "cookiePricesDisplayed",
    COOKIE_RGUID,
    COOKIE_RSG,
    COOKIE_RDG,
    COOKIE_RF1,
    "ibu_flt_pref_cfg",
];

/// Cookies sent with the client-id issuance call.
pub const CLIENT_ID_COOKIES: &[&str] = &[
    COOKIE_VISITOR_ID,
    COOKIE_TEST_BUCKET,
    "ibulanguage",
    "ibulocale",
];

/// Cookies surfaced in the diagnostic subset of a result.
pub const DIAGNOSTIC_COOKIES: &[&str] = &[
    COOKIE_CLIENT_ID,
    COOKIE_VISITOR_ID,
    COOKIE_COMBINED,
    COOKIE_BFA,
    COOKIE_RGUID,
    COOKIE_RF1,
];

// Endpoints (host-relative unless absolute)
pub const PATH_CREATE_CLIENT_ID: &str =
    "/restapi/soa2/10290/createclientid?systemcode=09&createtype=3&contentType=json";
pub const PATH_APP_CONFIG: &str = "/restapi/soa2/18088/getAppConfig.json";
pub const PATH_HEADER_INFO: &str = "/m/home/getHeaderInfo";
pub const PATH_SAVE_LOG: &str = "/restapi/soa2/27015/saveLogInfo";
pub const PATH_ROUTE_INFO: &str = "/restapi/soa2/27015/GetRouteInfo";
pub const PATH_SEARCH_SSE: &str = "/restapi/soa2/27015/FlightListSearchSSE";
pub const PATH_SEARCH: &str = "/restapi/soa2/27015/FlightListSearch";
pub const URL_TELEMETRY_COLLECT: &str = "https://ubt-sgp.trip.com/bee/collect";
pub const URL_LEGACY_METRICS: &str = "https://ubt-sgp.trip.com/bee/clog";
pub const URL_FINGERPRINT: &str = "https://sec-sgp.trip.com/rp/getRiskFingerprint";
pub const URL_RISK: &str = "https://sec-sgp.trip.com/rp/reportRisk";

// Telemetry codec
/// Sliding window and chunk size of the telemetry compressor
pub const CODEC_WINDOW: usize = 16_384;
/// Shortest back-reference worth emitting
pub const CODEC_MIN_MATCH: usize = 3;
/// Longest back-reference the format can express
pub const CODEC_MAX_MATCH: usize = 130;
/// Longest literal run behind one control byte
pub const CODEC_MAX_LITERAL_RUN: usize = 127;
/// Format tag emitted before any payload byte
pub const CODEC_FORMAT_MARKER: u8 = 19;
/// Output alphabet (no padding)
pub const CODEC_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
/// Version tag between the send timestamp and the encoded body
pub const TELEMETRY_FORMAT_TAG: &str = "!m1Legacy!";

// Pacing
/// Spacing between Stage A calls when the transport cannot pipeline
pub const STAGE_A_SPACING: Duration = Duration::from_millis(300);
/// Lower bound of the simulated page-render delay
pub const RENDER_DELAY_MIN_MS: u64 = 1_000;
/// Upper bound of the simulated page-render delay
pub const RENDER_DELAY_MAX_MS: u64 = 2_000;
/// Pause between the route-info refresh and the search fan-out
pub const PRE_SEARCH_DELAY: Duration = Duration::from_millis(100);

// Diagnostics
/// Maximum response body preview carried in protocol mismatch errors
pub const MAX_BODY_SNIPPET_CHARS: usize = 500;
/// Record count the backend returns for challenged requests
pub const BLOCKED_RECORD_COUNT: u64 = 1;

/// A/B assignments the list page reports with every search.
pub const AB_TEST_ASSIGNMENTS: &[(&str, &str)] = &[
    ("250811_IBU_wjrankol", "A"),
    ("250806_IBU_FiltersOpt", "A"),
    ("250812_IBU_FiltersOp2", "A"),
    ("251023_IBU_pricetool", "D"),
];
