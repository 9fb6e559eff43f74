//! The staged call sequence that follows bootstrap.
//!
//! | Stage | Calls | Shape | Policy |
//! |---|---|---|---|
//! | A | app config, header info, save log, route info | pipeline (join group if the transport pipelines) | best effort |
//! | B | route info refresh | single call | best effort |
//! | C | collect, main search, legacy metrics (optional) | join group | main search mandatory |
//! | D | fingerprint registration | single call | best effort |
//! | E | risk signal | single call | best effort |

use futures::future::{ready, FutureExt};
use log::{debug, info};
use serde::Serialize;

use super::outcome::{RequestOutcome, StepName, StepReport};
use super::pipeline::{step, JoinGroup, Pipeline, Settled, StepFuture};
use crate::config::{
    api_headers, Config, Endpoints, ACCEPT_ENCODING, ACCEPT_EVENT_STREAM, ACCEPT_JSON,
    ACCEPT_LANGUAGE, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, HEADER_ANTI_BOT, HEADER_COUNTRY,
    HEADER_CURRENCY, HEADER_LOCALE, HEADER_PAGE_ID, HEADER_PV_ID, HEADER_SESSION_ID,
    HEADER_TOKEN, HEADER_USER_RECOGNIZE, HEADER_VISITOR_ID, HEADER_WCLIENT_REQ,
    HEADER_W_PAYLOAD_SOURCE,
};
use crate::decode::{decode_search_response, response_text, DecodedSearch, SseSelection};
use crate::entropy::Entropy;
use crate::error_handling::{body_snippet, ScrapeError, StepError};
use crate::parse::ParsedUrlData;
use crate::payload::{
    ab_testing_string, app_config_payload, build_route_info_payload, build_search_payload,
    build_token_payload, build_w_payload, fingerprint_payload, header_info_payload, risk_payload,
    save_log_payload, PayloadContext, SearchOptions,
};
use crate::session::{BatchContext, FingerprintTokens, SessionState};
use crate::signing::{assemble, wclient_req_for, SignedHeaders, Signers};
use crate::telemetry::{build_telemetry_payload, collect_body, TelemetryInput};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// The main search as it settled.
#[derive(Debug, Clone)]
pub(crate) struct SearchOutcome {
    pub variant: StepName,
    pub status: u16,
    pub decoded: DecodedSearch,
}

/// Runs stages A to E for one scrape.
pub(crate) struct StageRunner<'a> {
    pub transport: &'a dyn Transport,
    pub config: &'a Config,
    pub signers: &'a Signers,
    pub parsed: &'a ParsedUrlData,
    pub options: &'a SearchOptions,
}

impl<'a> StageRunner<'a> {
    /// App config, header info, save log and the first route info.
    pub async fn stage_a(
        &self,
        session: &mut SessionState,
        batch: &BatchContext,
        entropy: &mut Entropy,
        report: &mut StepReport,
    ) {
        let endpoints = &self.config.endpoints;
        let requests = {
            let ctx = self.context(session, batch);
            let now = entropy.now_millis();
            vec![
                self.json_request(
                    StepName::AppConfig,
                    &endpoints.app_config,
                    &app_config_payload(&ctx),
                    session,
                ),
                self.json_request(
                    StepName::HeaderInfo,
                    &endpoints.header_info,
                    &header_info_payload(&ctx),
                    session,
                ),
                self.json_request(
                    StepName::SaveLog,
                    &endpoints.save_log,
                    &save_log_payload(&ctx, now),
                    session,
                ),
                self.json_request(
                    StepName::RouteInfo,
                    &endpoints.route_info,
                    &build_route_info_payload(&ctx),
                    session,
                ),
            ]
        };

        let settled = if self.transport.supports_pipelining() {
            info!("Stage A: {} calls, pipelined", requests.len());
            let mut group = JoinGroup::new();
            for (name, request) in requests {
                group.push(self.prepare(name, request));
            }
            group.settle().await
        } else {
            info!("Stage A: {} calls, sequential", requests.len());
            let spacing = self.config.pacing.then_some(self.config.stage_a_spacing);
            let mut pipeline = Pipeline::new(spacing);
            for (name, request) in requests {
                pipeline.push(self.prepare(name, request));
            }
            pipeline.run().await
        };
        absorb_settled(session, report, settled);
    }

    /// Route info again, with whatever Stage A taught the session.
    pub async fn stage_b(
        &self,
        session: &mut SessionState,
        batch: &BatchContext,
        report: &mut StepReport,
    ) {
        info!("Stage B: route info refresh");
        let (name, request) = {
            let ctx = self.context(session, batch);
            self.json_request(
                StepName::RouteInfoRefresh,
                &self.config.endpoints.route_info,
                &build_route_info_payload(&ctx),
                session,
            )
        };
        let (name, future) = self.prepare(name, request);
        absorb_settled(session, report, vec![(name, future.await)]);
    }

    /// Telemetry, the main search and the optional legacy metrics call,
    /// all in flight together.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::FatalSearch` naming the search variant when the
    /// main search did not produce a decodable response.
    pub async fn stage_c(
        &self,
        session: &SessionState,
        batch: &BatchContext,
        entropy: &mut Entropy,
        report: &mut StepReport,
    ) -> Result<SearchOutcome, ScrapeError> {
        let endpoints = &self.config.endpoints;
        let (variant, endpoint, selection, accept) = if self.options.is_refine() {
            (StepName::Search, &endpoints.search, SseSelection::Last, ACCEPT_JSON)
        } else {
            (
                StepName::SearchStream,
                &endpoints.search_sse,
                SseSelection::First,
                ACCEPT_EVENT_STREAM,
            )
        };
        let search_url = self.url(endpoint);
        let ctx = self.context(session, batch);

        let search_payload = build_search_payload(&ctx, self.options, entropy.now());
        let token_payload = build_token_payload(&ctx, self.options);
        let w_payload = build_w_payload(&ctx, entropy);
        let wclient = wclient_req_for(&api_path(&search_url), session, entropy);
        let signed = assemble(
            self.signers,
            &token_payload,
            &w_payload,
            self.transport.client_identity(),
            wclient,
        )
        .await;

        let ab_testing = ab_testing_string(entropy);
        let input = TelemetryInput {
            url: &self.parsed.url,
            ab_testing: &ab_testing,
            send_ts: entropy.now_millis(),
        };
        let telemetry = build_telemetry_payload(&ctx, &input, entropy);
        let beacon = collect_body(&telemetry)
            .map_err(|e| StepError::Decode(format!("unserializable telemetry: {e}")));
        debug!(
            "Batch {}: {} telemetry events, search variant {variant}",
            batch.batch_id,
            telemetry.ubt_list.len()
        );

        let mut group = JoinGroup::new();
        let collect = beacon.clone().map(|body| {
            self.beacon_request(
                StepName::TelemetryCollect,
                &endpoints.telemetry_collect,
                body,
                session,
            )
        });
        group.push(self.prepare(StepName::TelemetryCollect, collect));
        let search = serde_json::to_vec(&search_payload)
            .map_err(|e| StepError::Decode(format!("unserializable search payload: {e}")))
            .map(|body| self.search_request(variant, search_url, body, accept, session, &signed));
        group.push(self.prepare(variant, search));
        if self.config.enable_legacy_metrics {
            let clog = beacon.map(|body| {
                self.beacon_request(
                    StepName::LegacyMetrics,
                    &endpoints.legacy_metrics,
                    body,
                    session,
                )
            });
            group.push(self.prepare(StepName::LegacyMetrics, clog));
        }

        info!("Stage C: {} calls joined", group.len());
        let mut main = None;
        for (name, result) in group.settle().await {
            if name == variant {
                let checked = check_search(result, selection);
                report.push(match &checked {
                    Ok(search) => RequestOutcome {
                        step: name,
                        success: true,
                        status: Some(search.status),
                        error: None,
                    },
                    Err(e) => RequestOutcome::failed(name, e),
                });
                main = Some(checked);
            } else {
                report.record(name, &result);
            }
        }

        let failure = |detail: String| ScrapeError::FatalSearch {
            step: variant.to_string(),
            detail,
        };
        match main {
            Some(Ok(search)) => Ok(SearchOutcome {
                variant,
                status: search.status,
                decoded: search.decoded,
            }),
            Some(Err(e)) => Err(failure(self.describe(&e))),
            None => Err(failure("the search call never settled".to_string())),
        }
    }

    /// Anti-fingerprint registration.
    pub async fn stage_d(
        &self,
        session: &mut SessionState,
        batch: &BatchContext,
        entropy: &mut Entropy,
        report: &mut StepReport,
    ) {
        info!("Stage D: fingerprint registration");
        let (name, request) = {
            let ctx = self.context(session, batch);
            let payload = fingerprint_payload(&ctx, entropy.now_millis());
            self.json_request(
                StepName::Fingerprint,
                &self.config.endpoints.fingerprint,
                &payload,
                session,
            )
        };
        let (name, future) = self.prepare(name, request);
        let result = future.await.and_then(|response| {
            let text = response_text(&response).map_err(|e| StepError::Decode(e.to_string()))?;
            let tokens = FingerprintTokens::parse(&text).ok_or_else(|| {
                StepError::Decode("expected RGUID|RF1|RSG|RDG".to_string())
            })?;
            Ok((response, tokens))
        });
        match result {
            Ok((response, tokens)) => {
                debug!("Fingerprint tokens registered (rguid {})", tokens.rguid);
                session.absorb_response(&response);
                session.apply_fingerprint(tokens);
                report.record(name, &Ok(response));
            }
            Err(e) => report.push(RequestOutcome::failed(name, &e)),
        }
    }

    /// Risk signal, once the search has resolved.
    pub async fn stage_e(
        &self,
        session: &SessionState,
        batch: &BatchContext,
        entropy: &mut Entropy,
        report: &mut StepReport,
    ) {
        info!("Stage E: risk signal");
        let ctx = self.context(session, batch);
        let payload = risk_payload(&ctx, entropy.now_millis());
        let (name, request) = self.json_request(
            StepName::Risk,
            &self.config.endpoints.risk,
            &payload,
            session,
        );
        let (name, future) = self.prepare(name, request);
        report.record(name, &future.await);
    }

    fn context<'s>(
        &'s self,
        session: &'s SessionState,
        batch: &'s BatchContext,
    ) -> PayloadContext<'s> {
        PayloadContext {
            params: &self.parsed.params,
            session,
            batch,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        Endpoints::resolve(&self.parsed.origin, endpoint)
    }

    /// A ready-to-await call; a request that could not be built settles at once.
    fn prepare(
        &self,
        name: StepName,
        request: Result<HttpRequest, StepError>,
    ) -> (StepName, StepFuture<'a>) {
        match request {
            Ok(request) => step(self.transport, request),
            Err(e) => (name, ready(Err(e)).boxed()),
        }
    }

    /// Failure text; response snippets only in debug mode.
    fn describe(&self, error: &StepError) -> String {
        match error.snippet() {
            Some(snippet) if self.config.debug && !snippet.is_empty() => {
                format!("{error}; response: {snippet}")
            }
            _ => error.to_string(),
        }
    }

    /// Browser headers, cookies and the `x-ctx-*` context of an API call.
    fn api_request(
        &self,
        name: StepName,
        endpoint: &str,
        body: Vec<u8>,
        accept: &str,
        session: &SessionState,
    ) -> HttpRequest {
        let mut request =
            HttpRequest::post(name, self.url(endpoint), body).with_headers(api_headers(accept));
        if !endpoint.starts_with('/') {
            request.set_header("sec-fetch-site", "same-site");
        }
        request.set_header("cookie", session.cookie_header());
        request.set_header("origin", self.parsed.origin.as_str());
        request.set_header("referer", self.parsed.url.as_str());
        request.with_headers(session.context.pairs())
    }

    fn json_request<T: Serialize + ?Sized>(
        &self,
        name: StepName,
        endpoint: &str,
        payload: &T,
        session: &SessionState,
    ) -> (StepName, Result<HttpRequest, StepError>) {
        let request = serde_json::to_vec(payload)
            .map_err(|e| StepError::Decode(format!("unserializable payload: {e}")))
            .map(|body| self.api_request(name, endpoint, body, ACCEPT_JSON, session));
        (name, request)
    }

    /// Collector beacons go out as `text/plain` without cookies.
    fn beacon_request(
        &self,
        name: StepName,
        endpoint: &str,
        body: String,
        session: &SessionState,
    ) -> HttpRequest {
        let mut request = self.api_request(name, endpoint, body.into_bytes(), "*/*", session);
        request.set_header("content-type", CONTENT_TYPE_TEXT);
        request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("cookie"));
        request
    }

    /// The main search, headers in the order the page's fetch sends them.
    fn search_request(
        &self,
        name: StepName,
        url: String,
        body: Vec<u8>,
        accept: &str,
        session: &SessionState,
        signed: &SignedHeaders,
    ) -> HttpRequest {
        let origin = &self.parsed.origin;
        let context = &session.context;

        let mut headers: Vec<(&str, String)> = vec![
            ("accept", accept.to_string()),
            ("accept-language", ACCEPT_LANGUAGE.to_string()),
            ("accept-encoding", ACCEPT_ENCODING.to_string()),
            ("content-type", CONTENT_TYPE_JSON.to_string()),
            ("cookie", session.cookie_header()),
            ("cookieorigin", origin.clone()),
            ("currency", context.currency.clone()),
            ("locale", context.locale.clone()),
            ("origin", origin.clone()),
            ("priority", "u=1, i".to_string()),
            ("referer", self.parsed.url.clone()),
        ];
        if let Some(token) = &signed.token {
            headers.push((HEADER_TOKEN, token.clone()));
        }
        if let Some(source) = &signed.w_payload_source {
            headers.push((HEADER_W_PAYLOAD_SOURCE, source.clone()));
        }
        headers.extend([
            (HEADER_COUNTRY, context.country.clone()),
            (HEADER_CURRENCY, context.currency.clone()),
            (HEADER_LOCALE, context.locale.clone()),
            (HEADER_WCLIENT_REQ, signed.wclient_req.clone()),
            (HEADER_PAGE_ID, context.page_id.clone()),
            (HEADER_PV_ID, context.pv_id.clone()),
            (HEADER_SESSION_ID, context.session_id.clone()),
            (HEADER_VISITOR_ID, context.visitor_id.clone()),
            (HEADER_USER_RECOGNIZE, context.user_recognize.clone()),
        ]);
        if let Some(anti_bot) = &context.anti_bot {
            headers.push((HEADER_ANTI_BOT, anti_bot.clone()));
        }

        HttpRequest::post(name, url, body)
            .with_headers(headers.into_iter().map(|(k, v)| (k.to_string(), v)))
    }
}

struct CheckedSearch {
    status: u16,
    decoded: DecodedSearch,
}

/// Any non-2xx status or undecodable body of the main search is a protocol
/// mismatch.
fn check_search(
    result: Result<HttpResponse, StepError>,
    selection: SseSelection,
) -> Result<CheckedSearch, StepError> {
    match result {
        Ok(response) => decode_search_response(&response, selection)
            .map(|decoded| CheckedSearch {
                status: response.status,
                decoded,
            })
            .map_err(|e| StepError::ProtocolMismatch {
                status: response.status,
                reason: e.to_string(),
                snippet: body_snippet(&response.body),
            }),
        Err(StepError::Status { status, snippet }) => Err(StepError::ProtocolMismatch {
            status,
            reason: "non-success status".to_string(),
            snippet,
        }),
        Err(e) => Err(e),
    }
}

/// Records settled calls and takes the cookies of the successful ones.
fn absorb_settled(session: &mut SessionState, report: &mut StepReport, settled: Settled) {
    for (name, result) in settled {
        if let Ok(response) = &result {
            session.absorb_response(response);
        }
        report.record(name, &result);
    }
}

/// Path of an absolute endpoint URL, as signed into `x-ctx-wclient-req`.
fn api_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}
