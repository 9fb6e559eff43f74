//! Per-scrape session state.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::combined::CombinedCookie;
use super::cookies::{parse_set_cookie, CookieJar};
use crate::config::{
    COOKIE_BFA, COOKIE_CLIENT_ID, COOKIE_COMBINED, COOKIE_RDG, COOKIE_RF1, COOKIE_RGUID,
    COOKIE_RSG, COOKIE_VISITOR_ID, DEFAULT_PAGE_ID, DIAGNOSTIC_COOKIES, HEADER_ANTI_BOT,
    HEADER_COUNTRY, HEADER_CURRENCY, HEADER_LOCALE, HEADER_PAGE_ID, HEADER_PV_ID,
    HEADER_SESSION_ID, HEADER_USER_RECOGNIZE, HEADER_VISITOR_ID, USER_RECOGNIZE_NON_EU,
};
use crate::parse::{CityTable, ParsedUrlData};
use crate::transport::HttpResponse;

/// Default `x-ctx-*` headers every API call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextHeaders {
    pub country: String,
    pub currency: String,
    pub locale: String,
    pub page_id: String,
    pub pv_id: String,
    pub session_id: String,
    pub visitor_id: String,
    pub user_recognize: String,
    /// Echoed only when the site handed one out
    pub anti_bot: Option<String>,
}

impl ContextHeaders {
    /// Headers derived from the URL alone.
    pub fn from_url(parsed: &ParsedUrlData) -> Self {
        Self {
            country: parsed.region.to_ascii_uppercase(),
            currency: parsed.params.currency.to_ascii_uppercase(),
            locale: parsed.params.locale.clone(),
            page_id: DEFAULT_PAGE_ID.to_string(),
            pv_id: "1".to_string(),
            session_id: "1".to_string(),
            visitor_id: String::new(),
            user_recognize: USER_RECOGNIZE_NON_EU.to_string(),
            anti_bot: None,
        }
    }

    /// Header pairs in wire order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = [
            (HEADER_COUNTRY, &self.country),
            (HEADER_CURRENCY, &self.currency),
            (HEADER_LOCALE, &self.locale),
            (HEADER_PAGE_ID, &self.page_id),
            (HEADER_PV_ID, &self.pv_id),
            (HEADER_SESSION_ID, &self.session_id),
            (HEADER_VISITOR_ID, &self.visitor_id),
            (HEADER_USER_RECOGNIZE, &self.user_recognize),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
        if let Some(anti_bot) = &self.anti_bot {
            pairs.push((HEADER_ANTI_BOT.to_string(), anti_bot.clone()));
        }
        pairs
    }
}

/// Anti-fingerprint tokens handed out by the registration call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FingerprintTokens {
    pub rguid: String,
    pub rf1: String,
    pub rsg: String,
    pub rdg: String,
}

impl FingerprintTokens {
    /// Parses `{RGUID}|{RF1}|{RSG}|{RDG}`. The body may arrive JSON-quoted.
    pub fn parse(body: &str) -> Option<Self> {
        let body = body.trim().trim_matches('"');
        let fields: Vec<&str> = body.split('|').map(str::trim).collect();
        match fields.as_slice() {
            [rguid, rf1, rsg, rdg] if !rguid.is_empty() => Some(Self {
                rguid: rguid.to_string(),
                rf1: rf1.to_string(),
                rsg: rsg.to_string(),
                rdg: rdg.to_string(),
            }),
            _ => None,
        }
    }
}

/// Everything one scrape learns about its session.
///
/// Created per scrape and never shared; bootstrap enriches it, builders only
/// read it.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// `GUID` cookie
    pub client_id: String,
    /// `UBT_VID` cookie
    pub visitor_id: String,
    /// `_abtest_userid` cookie
    pub test_bucket: String,
    pub transaction_id: String,
    pub page_id: String,
    pub init_page_id: String,
    pub combined: CombinedCookie,
    pub cookies: CookieJar,
    pub context: ContextHeaders,
    pub cities: CityTable,
    pub fingerprint: FingerprintTokens,
}

impl SessionState {
    /// An empty session for the given URL.
    pub fn new(parsed: &ParsedUrlData) -> Self {
        Self {
            client_id: String::new(),
            visitor_id: String::new(),
            test_bucket: String::new(),
            transaction_id: String::new(),
            page_id: DEFAULT_PAGE_ID.to_string(),
            init_page_id: DEFAULT_PAGE_ID.to_string(),
            combined: CombinedCookie::default(),
            cookies: CookieJar::new(),
            context: ContextHeaders::from_url(parsed),
            cities: CityTable::new(),
            fingerprint: FingerprintTokens::default(),
        }
    }

    pub fn set_client_id(&mut self, client_id: &str) {
        self.client_id = client_id.to_string();
        self.cookies.set(COOKIE_CLIENT_ID, client_id);
    }

    pub fn set_visitor_id(&mut self, visitor_id: &str) {
        self.visitor_id = visitor_id.to_string();
        self.context.visitor_id = visitor_id.to_string();
        self.cookies.set(COOKIE_VISITOR_ID, visitor_id);
    }

    /// Adopts a `_combined` cookie as the session's transaction.
    pub fn apply_combined(&mut self, combined: CombinedCookie) {
        if let Some(transaction_id) = combined.transaction_id() {
            self.transaction_id = transaction_id.to_string();
        }
        if let Some(page_id) = combined.page_id() {
            self.page_id = page_id.to_string();
            self.context.page_id = page_id.to_string();
        }
        if let Some(init_page_id) = combined.init_page_id() {
            self.init_page_id = init_page_id.to_string();
        }
        self.cookies.set(COOKIE_COMBINED, combined.render());
        self.combined = combined;
    }

    /// Takes one cookie the site set. Identity and transaction cookies update
    /// their session fields; `_combined` is normalized first.
    pub fn absorb_cookie(&mut self, name: &str, value: &str) {
        match name {
            COOKIE_CLIENT_ID => self.set_client_id(value),
            COOKIE_VISITOR_ID => self.set_visitor_id(value),
            COOKIE_COMBINED => {
                let mut combined = CombinedCookie::parse(value);
                if combined.is_empty() {
                    return;
                }
                if combined.normalize() {
                    debug!("Replaced legacy marker in _combined");
                }
                self.apply_combined(combined);
            }
            _ => self.cookies.set(name, value),
        }
    }

    /// Takes every `Set-Cookie` of a response.
    pub fn absorb_response(&mut self, response: &HttpResponse) {
        for header in response.set_cookies() {
            match parse_set_cookie(header) {
                Some((name, value)) => self.absorb_cookie(&name, &value),
                None => debug!("Ignoring unparsable Set-Cookie: {header}"),
            }
        }
    }

    pub fn set_bfa(&mut self, bfa: String) {
        self.cookies.set(COOKIE_BFA, bfa);
    }

    /// Stores the anti-fingerprint tokens and their cookies.
    pub fn apply_fingerprint(&mut self, tokens: FingerprintTokens) {
        self.cookies.set(COOKIE_RGUID, tokens.rguid.clone());
        self.cookies.set(COOKIE_RF1, tokens.rf1.clone());
        self.cookies.set(COOKIE_RSG, tokens.rsg.clone());
        self.cookies.set(COOKIE_RDG, tokens.rdg.clone());
        self.fingerprint = tokens;
    }

    /// `_RF1` as last seen (token, else cookie).
    pub fn rf1(&self) -> &str {
        if self.fingerprint.rf1.is_empty() {
            self.cookies.get(COOKIE_RF1).unwrap_or_default()
        } else {
            &self.fingerprint.rf1
        }
    }

    pub fn cookie_header(&self) -> String {
        self.cookies.header()
    }

    /// Identifiers worth reporting with a result.
    pub fn diagnostic_cookies(&self) -> BTreeMap<String, String> {
        DIAGNOSTIC_COOKIES
            .iter()
            .filter_map(|name| {
                self.cookies
                    .get(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// Batch id shared by the telemetry beacon and the main search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchContext {
    pub batch_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_search_url;

    fn session() -> SessionState {
        let parsed = parse_search_url(
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01",
        )
        .expect("valid URL");
        SessionState::new(&parsed)
    }

    #[test]
    fn test_context_headers_order_and_defaults() {
        let mut session = session();
        session.set_visitor_id("1.abc");
        let pairs = session.context.pairs();
        let names: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "x-ctx-country",
                "x-ctx-currency",
                "x-ctx-locale",
                "x-ctx-ubt-pageid",
                "x-ctx-ubt-pvid",
                "x-ctx-ubt-sid",
                "x-ctx-ubt-vid",
                "x-ctx-user-recognize",
            ]
        );
        assert_eq!(pairs[0].1, "ID");
        assert_eq!(pairs[1].1, "IDR");
        assert_eq!(pairs[6].1, "1.abc");
        assert_eq!(pairs[7].1, "NON_EU");

        session.context.anti_bot = Some("tok".to_string());
        assert_eq!(session.context.pairs().len(), 9);
    }

    #[test]
    fn test_fingerprint_parse() {
        let tokens = FingerprintTokens::parse("\"g1|f1|s1|d1\"\n").expect("four fields");
        assert_eq!(tokens.rguid, "g1");
        assert_eq!(tokens.rdg, "d1");
        assert!(FingerprintTokens::parse("a|b|c").is_none());
        assert!(FingerprintTokens::parse("|b|c|d").is_none());
    }

    #[test]
    fn test_apply_combined_updates_ids_and_cookie() {
        let mut session = session();
        session.apply_combined(CombinedCookie::parse(
            "transactionId=1-mf-1-WEB&pageId=42&initPageId=41",
        ));
        assert_eq!(session.transaction_id, "1-mf-1-WEB");
        assert_eq!(session.page_id, "42");
        assert_eq!(session.init_page_id, "41");
        assert_eq!(session.context.page_id, "42");
        assert!(session.cookies.get("_combined").is_some());
    }

    #[test]
    fn test_rf1_prefers_fingerprint_tokens() {
        let mut session = session();
        session.cookies.set("_RF1", "cookie-rf1");
        assert_eq!(session.rf1(), "cookie-rf1");
        session.apply_fingerprint(FingerprintTokens::parse("g|token-rf1|s|d").expect("valid"));
        assert_eq!(session.rf1(), "token-rf1");
        assert_eq!(session.cookies.get("_RF1"), Some("token-rf1"));
    }

    #[test]
    fn test_diagnostic_cookies_subset() {
        let mut session = session();
        session.set_client_id("09031234567890");
        session.cookies.set("ibulocale", "en_id");
        let diag = session.diagnostic_cookies();
        assert_eq!(diag.get("GUID").map(String::as_str), Some("09031234567890"));
        assert!(!diag.contains_key("ibulocale"));
    }

    #[test]
    fn test_absorb_response_routes_identity_cookies() {
        let mut session = session();
        let response = HttpResponse::new(200, "")
            .with_header("Set-Cookie", "GUID=09035555555555; Path=/; Secure")
            .with_header("Set-Cookie", "UBT_VID=1.xyz; Path=/")
            .with_header(
                "Set-Cookie",
                "_combined=transactionId%3D1-mf-20260101000000000-H5%26pageId%3D7; Path=/",
            )
            .with_header("Set-Cookie", "ibulanguage=EN; Path=/")
            .with_header("Set-Cookie", "; broken");
        session.absorb_response(&response);

        assert_eq!(session.client_id, "09035555555555");
        assert_eq!(session.context.visitor_id, "1.xyz");
        assert_eq!(session.transaction_id, "1-mf-20260101000000000-WEB");
        assert_eq!(session.page_id, "7");
        assert_eq!(session.cookies.get("ibulanguage"), Some("EN"));
        assert_eq!(
            session.cookies.get("_combined"),
            Some("transactionId%3D1-mf-20260101000000000-WEB%26pageId%3D7")
        );
    }
}
