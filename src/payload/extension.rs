//! `head.extension` name/value lists.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::PayloadContext;

/// `x-ua` the list page reports
pub const X_UA: &str = "v=3_os=ONLINE_osv=10";

/// One `{"name":..,"value":..}` entry; some entries carry no value at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extension {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Extension {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(value.into()),
        }
    }

    fn bare(name: &'static str) -> Self {
        Self { name, value: None }
    }
}

/// Entries shared by the full and the abbreviated list, up to `x-ua`/`PageId`.
fn identity_entries(ctx: &PayloadContext<'_>) -> Vec<Extension> {
    let session = ctx.session;
    vec![
        Extension::new("source", "ONLINE"),
        Extension::new("sotpGroup", "Trip"),
        Extension::new("sotpLocale", ctx.params.locale.as_str()),
        Extension::new("sotpCurrency", ctx.params.currency.as_str()),
        Extension::new("allianceID", "0"),
        Extension::new("sid", "0"),
        Extension::new("ouid", ""),
        Extension::bare("uuid"),
        Extension::new("useDistributionType", "1"),
        Extension::new("flt_app_session_transactionId", session.transaction_id.as_str()),
        Extension::new("vid", session.visitor_id.as_str()),
        Extension::new("pvid", session.context.pv_id.as_str()),
        Extension::new("Flt_SessionId", session.context.session_id.as_str()),
        Extension::bare("channel"),
        Extension::new("x-ua", X_UA),
        Extension::new("PageId", session.page_id.as_str()),
    ]
}

/// The 24-entry list of the main search head.
pub fn full_extensions(ctx: &PayloadContext<'_>, client_time: DateTime<Utc>) -> Vec<Extension> {
    let mut entries = identity_entries(ctx);
    entries.extend([
        Extension::new(
            "clientTime",
            client_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Extension::new("LowPriceSource", ctx.params.low_price_source.as_str()),
        Extension::new("Flt_BatchId", ctx.batch.batch_id.as_str()),
        Extension::new("BlockTokenTimeout", "0"),
        Extension::new("full_link_time_scene", "pure_list_page"),
        Extension::new("xproduct", "baggage"),
        Extension::new("units", "METRIC"),
        Extension::new("sotpUnit", "METRIC"),
    ]);
    entries
}

/// The abbreviated list the in-page signer is handed.
pub fn token_extensions(ctx: &PayloadContext<'_>) -> Vec<Extension> {
    let mut entries = identity_entries(ctx);
    entries.push(Extension::new("Flt_BatchId", ctx.batch.batch_id.as_str()));
    entries
}

/// Looks up an entry's value.
pub fn extension_value<'e>(entries: &'e [Extension], name: &str) -> Option<&'e str> {
    entries
        .iter()
        .find(|e| e.name == name)
        .and_then(|e| e.value.as_deref())
}
