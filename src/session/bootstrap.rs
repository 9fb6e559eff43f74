//! Session bootstrap sequencer.
//!
//! Replays what a browser does between opening the list URL and the page's
//! first API call: visit the site root, get a client id issued, load the list
//! page and let it render. Only the list page visit is mandatory; every other
//! failure is recorded and the session continues with what it has.

use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use super::combined::{bfa_cookie, transaction_id_at, CombinedCookie};
use super::cookies::CookieJar;
use super::state::{BatchContext, SessionState};
use crate::config::{
    api_headers, document_headers, Config, Endpoints, ACCEPT_JSON, CLIENT_ID_COOKIES,
    CLIENT_ID_DIGITS, COOKIE_BFA, COOKIE_CLIENT_ID, COOKIE_COMBINED, COOKIE_TEST_BUCKET,
    COOKIE_VISITOR_ID, HEADER_ANTI_BOT, HEADER_COUNTRY, HEADER_CURRENCY, HEADER_LOCALE,
    TRACKING_COOKIES, VISITOR_SUFFIX_LEN,
};
use crate::decode::response_text;
use crate::engine::{send_checked, StepName, StepReport};
use crate::entropy::Entropy;
use crate::error_handling::ScrapeError;
use crate::parse::{build_city_table, extract_initial_state, ParsedUrlData};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// A session ready for the API stages.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub session: SessionState,
    pub batch: BatchContext,
}

/// Runs the bootstrap sequence for one scrape.
///
/// Every call is recorded in `report`.
///
/// # Errors
///
/// Returns `ScrapeError::Bootstrap` when the list page itself cannot be loaded.
pub async fn bootstrap(
    transport: &dyn Transport,
    config: &Config,
    parsed: &ParsedUrlData,
    entropy: &mut Entropy,
    report: &mut StepReport,
) -> Result<Bootstrapped, ScrapeError> {
    let mut session = SessionState::new(parsed);

    let root = send_checked(transport, root_request(parsed)).await;
    report.record(StepName::RootVisit, &root);
    let root_cookies = match &root {
        Ok(response) => {
            seed_context(&mut session, response);
            collect_cookies(response)
        }
        Err(_) => CookieJar::new(),
    };
    seed_identity(&mut session, &root_cookies, entropy);

    let issued = send_checked(transport, client_id_request(config, parsed, &session)).await;
    report.record(StepName::CreateClientId, &issued);
    if let Ok(response) = &issued {
        match parse_client_id(response) {
            Some(client_id) => {
                debug!("Client id issued: {client_id}");
                session.set_client_id(&client_id);
            }
            None => warn!(
                "createclientid answered without a ClientID, keeping {}",
                session.client_id
            ),
        }
    }

    let page = send_checked(transport, search_page_request(parsed, &session)).await;
    report.record(StepName::SearchPageVisit, &page);
    let page = page.map_err(|e| ScrapeError::Bootstrap {
        step: StepName::SearchPageVisit.to_string(),
        detail: e.to_string(),
    })?;
    let page_combined = absorb_search_page(&mut session, &page);

    if config.pacing {
        let (low, high) = config.render_delay_ms;
        let delay = entropy.between(low, high);
        debug!("Waiting {delay} ms for the list page to render");
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if !page_combined {
        debug!("No page-specific _combined, synthesizing one");
        let transaction_id = transaction_id_at(entropy.now());
        let combined = CombinedCookie::synthesize(&transaction_id, &session.page_id, false);
        session.apply_combined(combined);
    }
    if !session.cookies.contains(COOKIE_BFA) {
        let bfa = bfa_cookie(
            &session.visitor_id,
            entropy.now_millis(),
            &session.init_page_id,
        );
        session.set_bfa(bfa);
    }

    let batch = BatchContext {
        batch_id: entropy.uuid(),
    };
    info!(
        "Session ready: transaction {} page {} ({} cookies, {} cities)",
        session.transaction_id,
        session.page_id,
        session.cookies.len(),
        session.cities.len()
    );

    Ok(Bootstrapped { session, batch })
}

fn root_request(parsed: &ParsedUrlData) -> HttpRequest {
    HttpRequest::get(StepName::RootVisit, format!("{}/", parsed.origin))
        .with_headers(document_headers())
}

fn client_id_request(
    config: &Config,
    parsed: &ParsedUrlData,
    session: &SessionState,
) -> HttpRequest {
    let url = Endpoints::resolve(&parsed.origin, &config.endpoints.create_client_id);
    let mut request =
        HttpRequest::post(StepName::CreateClientId, url, "{}").with_headers(api_headers(ACCEPT_JSON));
    request.set_header("cookie", session.cookies.header_for(CLIENT_ID_COOKIES));
    request.set_header("origin", parsed.origin.as_str());
    request.set_header("referer", format!("{}/", parsed.origin));
    request
}

fn search_page_request(parsed: &ParsedUrlData, session: &SessionState) -> HttpRequest {
    let mut request =
        HttpRequest::get(StepName::SearchPageVisit, parsed.url.as_str())
            .with_headers(document_headers());
    request.set_header("sec-fetch-site", "same-origin");
    request.set_header("referer", format!("{}/", parsed.origin));
    request.set_header("cookie", session.cookie_header());
    request
}

fn collect_cookies(response: &HttpResponse) -> CookieJar {
    let mut jar = CookieJar::new();
    for header in response.set_cookies() {
        if jar.absorb_set_cookie(header).is_none() {
            debug!("Ignoring unparsable Set-Cookie: {header}");
        }
    }
    jar
}

/// Context headers the site announced override the URL-derived defaults.
fn seed_context(session: &mut SessionState, response: &HttpResponse) {
    let announced = |name: &str| {
        response
            .header(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(country) = announced(HEADER_COUNTRY) {
        session.context.country = country;
    }
    if let Some(currency) = announced(HEADER_CURRENCY) {
        session.context.currency = currency;
    }
    if let Some(locale) = announced(HEADER_LOCALE) {
        session.context.locale = locale;
    }
    session.context.anti_bot = announced(HEADER_ANTI_BOT);
}

/// Identity cookies from the root visit, generated where the site set none.
fn seed_identity(session: &mut SessionState, root: &CookieJar, entropy: &mut Entropy) {
    let present = |name: &str| root.get(name).filter(|v| !v.is_empty()).map(str::to_string);

    let client_id = present(COOKIE_CLIENT_ID).unwrap_or_else(|| entropy.digits(CLIENT_ID_DIGITS));
    session.set_client_id(&client_id);

    let visitor_id = present(COOKIE_VISITOR_ID).unwrap_or_else(|| {
        format!(
            "{}.{}",
            entropy.now_millis(),
            entropy.alphanumeric(VISITOR_SUFFIX_LEN)
        )
    });
    session.set_visitor_id(&visitor_id);

    session.test_bucket = entropy.uuid();
    session
        .cookies
        .set(COOKIE_TEST_BUCKET, session.test_bucket.clone());

    for &name in TRACKING_COOKIES {
        if let Some(value) = present(name) {
            session.cookies.set(name, value);
        }
    }

    if let Some(raw) = present(COOKIE_COMBINED) {
        session.absorb_cookie(COOKIE_COMBINED, &raw);
    }
}

/// `ClientID` of the issuance response.
fn parse_client_id(response: &HttpResponse) -> Option<String> {
    let text = response_text(response).ok()?;
    let body: Value = serde_json::from_str(&text).ok()?;
    match body.get("ClientID")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Takes the list page's cookies and city table. Returns whether the page
/// set its own `_combined`.
fn absorb_search_page(session: &mut SessionState, page: &HttpResponse) -> bool {
    let page_combined = collect_cookies(page)
        .get(COOKIE_COMBINED)
        .is_some_and(|raw| !CombinedCookie::parse(raw).is_empty());
    session.absorb_response(page);

    match response_text(page) {
        Ok(html) => match extract_initial_state(&html) {
            Some(state) => session.cities = build_city_table(&state),
            None => debug!("List page carried no initial state"),
        },
        Err(e) => warn!("List page body unreadable: {e}"),
    }

    page_combined
}
