//! The `_combined` transaction cookie and its `_bfa` companion.

use chrono::{DateTime, Utc};

use crate::config::{
    BFA_SPAN_MS, LEGACY_TRANSACTION_MARKER, PRODUCTION_TRANSACTION_MARKER, TRANSACTION_ID_PREFIX,
};

const KEY_TRANSACTION_ID: &str = "transactionId";
const KEY_PAGE_ID: &str = "pageId";
const KEY_INIT_PAGE_ID: &str = "initPageId";
const KEY_DISTRIBUTION: &str = "usedistributionchannels";

/// Decoded `_combined` cookie: ordered `key=value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedCookie {
    fields: Vec<(String, String)>,
}

impl CombinedCookie {
    /// Parses a raw (URL-encoded) cookie value.
    pub fn parse(raw: &str) -> Self {
        let decoded = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        let fields = decoded
            .split('&')
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { fields }
    }

    /// A locally generated cookie for a session the site never tagged.
    pub fn synthesize(
        transaction_id: &str,
        page_id: &str,
        use_distribution_channels: bool,
    ) -> Self {
        let flag = if use_distribution_channels { "True" } else { "False" };
        Self {
            fields: vec![
                (KEY_TRANSACTION_ID.to_string(), transaction_id.to_string()),
                (KEY_PAGE_ID.to_string(), page_id.to_string()),
                (KEY_INIT_PAGE_ID.to_string(), page_id.to_string()),
                (KEY_DISTRIBUTION.to_string(), flag.to_string()),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.get(KEY_TRANSACTION_ID).filter(|v| !v.is_empty())
    }

    pub fn page_id(&self) -> Option<&str> {
        self.get(KEY_PAGE_ID).filter(|v| !v.is_empty())
    }

    /// `initPageId`, falling back to `pageId`.
    pub fn init_page_id(&self) -> Option<&str> {
        self.get(KEY_INIT_PAGE_ID)
            .filter(|v| !v.is_empty())
            .or_else(|| self.page_id())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replaces the legacy transaction marker everywhere it occurs. Returns
    /// whether anything changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        for (_, value) in &mut self.fields {
            if value.contains(LEGACY_TRANSACTION_MARKER) {
                *value = normalize_marker(value);
                changed = true;
            }
        }
        changed
    }

    /// Unencoded `k=v&k=v` form.
    pub fn to_plain(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Cookie value: the plain form, URL-encoded.
    pub fn render(&self) -> String {
        urlencoding::encode(&self.to_plain()).into_owned()
    }
}

/// Swaps the legacy placeholder marker for the production one.
pub fn normalize_marker(value: &str) -> String {
    value.replace(LEGACY_TRANSACTION_MARKER, PRODUCTION_TRANSACTION_MARKER)
}

/// `1-mf-{yyyyMMddHHmmssSSS}-WEB`
pub fn transaction_id_at(now: DateTime<Utc>) -> String {
    format!(
        "{TRANSACTION_ID_PREFIX}{}{PRODUCTION_TRANSACTION_MARKER}",
        now.format("%Y%m%d%H%M%S%3f")
    )
}

/// `1.{visitorId}.1.{ts}.{ts+20000}.1.1.{initPageId}`
pub fn bfa_cookie(visitor_id: &str, ts_millis: i64, init_page_id: &str) -> String {
    format!(
        "1.{visitor_id}.1.{ts_millis}.{}.1.1.{init_page_id}",
        ts_millis + BFA_SPAN_MS
    )
}
