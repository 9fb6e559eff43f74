//! HTTP client initialization.
//!
//! This module builds the `reqwest` client behind the default transport.

use std::time::Duration;

use reqwest::{ClientBuilder, Proxy};

use crate::config::Config;
use crate::error_handling::InitializationError;

/// Initializes the HTTP client for one scrape.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the config
/// - Timeout from the config
/// - Redirects not followed: the transport follows them itself so each hop's
///   `Set-Cookie` reaches the next hop and the session
/// - No cookie store: cookies are rendered explicitly per call
/// - No transparent decompression: the response decoder owns `content-encoding`
/// - The given proxy, if any, for every scheme
///
/// # Errors
///
/// Returns `InitializationError::ProxyError` if the proxy URL is rejected, or
/// `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(
    config: &Config,
    proxy: Option<&str>,
) -> Result<reqwest::Client, InitializationError> {
    let mut builder = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::none());

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = Proxy::all(proxy.trim())
            .map_err(|e| InitializationError::ProxyError(format!("{proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}
