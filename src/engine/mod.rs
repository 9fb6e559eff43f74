//! Orchestration engine.
//!
//! This module provides:
//! - Step names and the mandatory/best-effort policy table
//! - The two composition primitives (`Pipeline`, `JoinGroup`)
//! - The staged call sequence and result assembly
//! - [`Scraper`], the single "run scrape" entry point
//!
//! Each scrape owns its session, transport and report; nothing is shared
//! between concurrent scrapes.

mod outcome;
mod pipeline;
mod result;
mod stages;

use std::sync::Arc;

use log::{debug, info};

use crate::config::{Config, PRE_SEARCH_DELAY};
use crate::entropy::Entropy;
use crate::error_handling::ScrapeError;
use crate::parse::parse_search_url;
use crate::payload::{SearchOptions, SortSpec};
use crate::session::{bootstrap, Bootstrapped};
use crate::signing::Signers;
use crate::transport::{ReqwestTransport, Transport};

use stages::StageRunner;

// Re-export public API
pub use outcome::{RequestOutcome, StepName, StepPolicy, StepReport};
pub use pipeline::{send_checked, step, JoinGroup, Pipeline, Settled, StepFuture};
pub use result::{FlightSearchResult, RequestEcho, ScrapeResponse};

/// One scrape as the caller asks for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// The list page URL
    pub url: String,
    /// Proxy for this scrape only (overrides the configured one)
    pub proxy: Option<String>,
    pub options: SearchOptions,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Refines a previous search by its product id.
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.options.product_id = Some(product_id.into());
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.options.sort = Some(sort);
        self
    }
}

/// Runs scrapes with one configuration and one pair of signers.
///
/// # Examples
///
/// ```no_run
/// use flight_scout::{Config, Entropy, ScrapeRequest, Scraper, Signers};
///
/// # #[tokio::main]
/// # async fn main() {
/// let scraper = Scraper::new(Config::default(), Signers::none());
/// let request = ScrapeRequest::new(
///     "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&triptype=ow",
/// );
/// let response = scraper.respond(&request, &mut Entropy::from_os()).await;
/// println!("{}", response.message);
/// # }
/// ```
#[derive(Clone)]
pub struct Scraper {
    config: Config,
    signers: Signers,
    transport: Option<Arc<dyn Transport>>,
}

impl Scraper {
    pub fn new(config: Config, signers: Signers) -> Self {
        Self {
            config,
            signers,
            transport: None,
        }
    }

    /// Sends every call through `transport` instead of a fresh `reqwest`
    /// client per scrape. Request proxies are then ignored.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one scrape.
    ///
    /// # Errors
    ///
    /// - `ScrapeError::Validation` for a malformed URL (no call is made)
    /// - `ScrapeError::Initialization` if the HTTP client cannot be built
    /// - `ScrapeError::Bootstrap` if the list page cannot be loaded
    /// - `ScrapeError::FatalSearch` if the main search fails
    pub async fn run_scrape(
        &self,
        request: &ScrapeRequest,
        entropy: &mut Entropy,
    ) -> Result<FlightSearchResult, ScrapeError> {
        let mut report = StepReport::new();
        let mut result = self.execute(request, entropy, &mut report).await?;
        result.steps = report.into_outcomes();
        Ok(result)
    }

    /// Runs one scrape and wraps the outcome, failures included, in the
    /// serialisable envelope.
    pub async fn respond(&self, request: &ScrapeRequest, entropy: &mut Entropy) -> ScrapeResponse {
        let mut report = StepReport::new();
        let result = self.execute(request, entropy, &mut report).await;
        ScrapeResponse::from_result(result, report.into_outcomes())
    }

    async fn execute(
        &self,
        request: &ScrapeRequest,
        entropy: &mut Entropy,
        report: &mut StepReport,
    ) -> Result<FlightSearchResult, ScrapeError> {
        let parsed = parse_search_url(&request.url)?;

        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => transport.clone(),
            None => Arc::new(ReqwestTransport::new(
                &self.config,
                request.proxy.as_deref(),
            )?),
        };
        info!(
            "Scraping {} {}-{} on {}",
            parsed.params.effective_trip_type().short_code(),
            parsed.params.departure_city,
            parsed.params.arrival_city,
            parsed.hostname
        );

        let Bootstrapped { mut session, batch } =
            bootstrap(transport.as_ref(), &self.config, &parsed, entropy, report).await?;

        let stages = StageRunner {
            transport: transport.as_ref(),
            config: &self.config,
            signers: &self.signers,
            parsed: &parsed,
            options: &request.options,
        };
        stages.stage_a(&mut session, &batch, entropy, report).await;
        stages.stage_b(&mut session, &batch, report).await;
        if self.config.pacing {
            tokio::time::sleep(PRE_SEARCH_DELAY).await;
        }
        let search = stages.stage_c(&session, &batch, entropy, report).await?;
        stages.stage_d(&mut session, &batch, entropy, report).await;
        stages.stage_e(&session, &batch, entropy, report).await;

        debug!(
            "Scrape finished after {} calls, status {}",
            report.outcomes().len(),
            search.status
        );
        let echo = RequestEcho::new(&parsed, &request.options, search.variant, &session, &batch);
        Ok(FlightSearchResult::new(
            search.status,
            search.decoded,
            &session,
            echo,
            self.config.debug,
        ))
    }
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper")
            .field("config", &self.config)
            .field("fixed_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// One-shot convenience over [`Scraper::respond`].
pub async fn run_scrape(
    config: Config,
    signers: Signers,
    request: &ScrapeRequest,
    entropy: &mut Entropy,
) -> ScrapeResponse {
    Scraper::new(config, signers).respond(request, entropy).await
}
