//! flight_scout library: flight-search session replay
//!
//! This library reproduces, over plain HTTP, what a flight-search web front-end
//! does to get a search answered: the session bootstrap (cookies, client id,
//! list page visit), the staged API calls around the search, the signed
//! headers, and the compressed telemetry beacon the page posts alongside.
//!
//! # Example
//!
//! ```no_run
//! use flight_scout::{Config, Entropy, ScrapeRequest, Scraper, Signers};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scraper = Scraper::new(Config::default(), Signers::none());
//! let request = ScrapeRequest::new(
//!     "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&rdate=2026-02-03&triptype=rt",
//! );
//!
//! let result = scraper.run_scrape(&request, &mut Entropy::from_os()).await?;
//! println!("{} records (blocked: {})", result.record_count.unwrap_or(0), result.blocked);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
pub mod decode;
pub mod engine;
mod entropy;
mod error_handling;
pub mod initialization;
pub mod parse;
pub mod payload;
pub mod session;
pub mod signing;
pub mod telemetry;
pub mod transport;

// Re-export public API
pub use config::{Config, Endpoints, LogFormat, LogLevel};
pub use engine::{
    run_scrape, FlightSearchResult, RequestEcho, RequestOutcome, ScrapeRequest, ScrapeResponse,
    Scraper, StepName,
};
pub use entropy::{Clock, Entropy, FixedClock, SystemClock};
pub use error_handling::{
    DecodeError, ErrorType, InitializationError, OracleError, ScrapeError, StepError,
};
pub use payload::{SearchOptions, SortSpec};
pub use signing::{HttpSigningOracle, NoopOracle, Signers, TokenOracle, WPayloadOracle};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
