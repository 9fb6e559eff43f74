//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `flight_scout` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Printing the response envelope as JSON
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use flight_scout::initialization::init_logger_with;
use flight_scout::{
    Config, Entropy, HttpSigningOracle, LogFormat, LogLevel, ScrapeRequest, Scraper, Signers,
    SortSpec,
};

/// Signer service URL used when `--signer-url` is not given
const SIGNER_URL_ENV: &str = "FLIGHT_SCOUT_SIGNER_URL";

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Initial search
/// flight_scout "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&triptype=ow"
///
/// # Refine a previous search, cheapest first, through a proxy
/// flight_scout "$URL" --product-id 1a2b3c --sort-by Price --proxy http://127.0.0.1:8080
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "flight_scout",
    about = "Runs one flight search the way the site's own front-end does."
)]
struct Cli {
    /// Flight list page URL
    url: String,

    /// Proxy URL for every call of this scrape
    #[arg(long)]
    proxy: Option<String>,

    /// Product id of a previous search (switches to the refine search)
    #[arg(long)]
    product_id: Option<String>,

    /// Result ordering field, e.g. Direct or Price (switches to the refine search)
    #[arg(long)]
    sort_by: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort_by")]
    descending: bool,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Also send the legacy metrics call alongside the search
    #[arg(long)]
    enable_metrics: bool,

    /// Include response snippets in failure messages
    #[arg(long)]
    debug: bool,

    /// Skip the human-like delays between calls
    #[arg(long)]
    no_pacing: bool,

    /// External signer service for the token and w-payload-source headers
    ///
    /// Falls back to the FLIGHT_SCOUT_SIGNER_URL environment variable. Without
    /// a signer the search is sent without those headers.
    #[arg(long)]
    signer_url: Option<String>,

    /// HTTP User-Agent header value
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_seconds: Option<u64>,
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout_seconds: self.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            pacing: !self.no_pacing,
            enable_legacy_metrics: self.enable_metrics,
            debug: self.debug,
            ..Config::default()
        }
    }

    fn request(&self) -> ScrapeRequest {
        let mut request = ScrapeRequest::new(self.url.clone());
        if let Some(proxy) = &self.proxy {
            request = request.with_proxy(proxy.clone());
        }
        if let Some(product_id) = &self.product_id {
            request = request.with_product_id(product_id.clone());
        }
        if let Some(order_by) = &self.sort_by {
            request = request.with_sort(SortSpec {
                order_by: order_by.clone(),
                ascending: !self.descending,
            });
        }
        request
    }
}

fn signers(signer_url: Option<String>, timeout: Duration) -> Result<Signers> {
    let signer_url = signer_url.or_else(|| std::env::var(SIGNER_URL_ENV).ok());
    match signer_url.filter(|url| !url.trim().is_empty()) {
        Some(url) => {
            let oracle = HttpSigningOracle::new(url.as_str())
                .with_context(|| format!("Invalid signer URL {url}"))?;
            log::info!("Signing through {url} (timeout {}s)", timeout.as_secs());
            Ok(Signers::shared(oracle))
        }
        None => {
            log::warn!("No signer configured; token and w-payload-source headers will be omitted");
            Ok(Signers::none())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();
    let config = cli.config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let signers = signers(
        cli.signer_url.clone(),
        Duration::from_secs(config.timeout_seconds),
    )?;
    let scraper = Scraper::new(config, signers);
    let response = scraper
        .respond(&cli.request(), &mut Entropy::from_os())
        .await;

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{json}");

    if !response.success {
        eprintln!("flight_scout error: {}", response.message);
        process::exit(1);
    }
    Ok(())
}
