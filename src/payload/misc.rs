//! Small bodies of the best-effort calls.

use serde_json::{json, Value};

use super::PayloadContext;
use crate::config::{APP_ID, CAPTAIN_APP_ID};

/// `getAppConfig.json`
pub fn app_config_payload(ctx: &PayloadContext<'_>) -> Value {
    json!({
        "appId": APP_ID,
        "locale": ctx.params.locale,
        "currency": ctx.params.currency,
        "head": {
            "cid": ctx.session.client_id,
            "cver": "3",
            "lang": "01",
            "sid": "8888",
            "syscode": "40",
        },
    })
}

/// `getHeaderInfo`
pub fn header_info_payload(ctx: &PayloadContext<'_>) -> Value {
    json!({
        "locale": ctx.params.locale,
        "currency": ctx.params.currency,
        "pageId": ctx.session.page_id,
        "channel": "online",
    })
}

/// `saveLogInfo`: the page's "list page entered" log line.
pub fn save_log_payload(ctx: &PayloadContext<'_>, now_millis: i64) -> Value {
    json!({
        "logType": "flight_list_enter",
        "transactionId": ctx.session.transaction_id,
        "pageId": ctx.session.page_id,
        "vid": ctx.session.visitor_id,
        "clientTime": now_millis,
        "content": {
            "tripType": ctx.params.effective_trip_type().short_code(),
            "pageSource": ctx.params.page_source,
        },
    })
}

/// Anti-fingerprint registration.
pub fn fingerprint_payload(ctx: &PayloadContext<'_>, now_millis: i64) -> Value {
    json!({
        "appId": CAPTAIN_APP_ID,
        "guid": ctx.session.client_id,
        "vid": ctx.session.visitor_id,
        "pageId": ctx.session.page_id,
        "ts": now_millis,
    })
}

/// Risk signal sent once the search has resolved.
pub fn risk_payload(ctx: &PayloadContext<'_>, now_millis: i64) -> Value {
    json!({
        "rguid": ctx.session.fingerprint.rguid,
        "rf1": ctx.session.rf1(),
        "guid": ctx.session.client_id,
        "transactionId": ctx.session.transaction_id,
        "pageId": ctx.session.page_id,
        "batchId": ctx.batch.batch_id,
        "ts": now_millis,
    })
}
