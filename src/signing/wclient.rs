//! Local `x-ctx-wclient-req` computation.

use md5::{Digest, Md5};

use crate::entropy::Entropy;
use crate::session::SessionState;

/// Upper bound (inclusive) of the per-call random component
const NONCE_MAX: u64 = 9_999_999;

/// `MD5("{apiPath};POST;-{epochMs}-{nonce};{guid};{visitorId};;{rf1}")`, hex.
///
/// The empty field between visitor id and `rf1` is the device id, which a
/// browser without the native app never has.
pub fn wclient_req(
    api_path: &str,
    epoch_ms: i64,
    nonce: u64,
    guid: &str,
    visitor_id: &str,
    rf1: &str,
) -> String {
    let input = format!("{api_path};POST;-{epoch_ms}-{nonce};{guid};{visitor_id};;{rf1}");
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Header value for a call to `api_path` made now.
pub fn wclient_req_for(api_path: &str, session: &SessionState, entropy: &mut Entropy) -> String {
    let nonce = entropy.between(0, NONCE_MAX);
    wclient_req(
        api_path,
        entropy.now_millis(),
        nonce,
        &session.client_id,
        &session.visitor_id,
        session.rf1(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wclient_req_known_digest() {
        assert_eq!(
            wclient_req(
                "/restapi/soa2/27015/FlightListSearchSSE",
                1_767_225_600_000,
                1_234_567,
                "09031234567890",
                "1767225600000.abcdef123456",
                "rf1",
            ),
            "bc3b71ed2164b1e2ad213f535c7aa3bf"
        );
    }

    #[test]
    fn test_wclient_req_empty_input_digest() {
        // MD5 of ";POST;-0-0;;;;"
        assert_eq!(wclient_req("", 0, 0, "", "", ""), "6db688f214006dd8df10d2110ce1d7b5");
    }
}
