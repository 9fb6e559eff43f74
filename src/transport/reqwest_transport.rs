//! Default transport over `reqwest`.

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use url::Url;

use super::{HttpRequest, HttpResponse, Transport};
use crate::config::Config;
use crate::error_handling::{step_error_from_reqwest, ErrorType, InitializationError, StepError};
use crate::initialization::init_client;
use crate::session::CookieJar;

/// Maximum redirect hops followed per call.
const MAX_REDIRECTS: usize = 10;

/// Sends calls with one `reqwest::Client` (optional proxy, browser user agent).
///
/// Redirects are followed here rather than by the client: every hop's
/// `Set-Cookie` headers are replayed on the next same-host hop and handed back
/// with the final response, ahead of its own headers.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestTransport {
    /// Builds the transport from the config, overriding its proxy with `proxy`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// Returns an `InitializationError` if the client cannot be built.
    pub fn new(config: &Config, proxy: Option<&str>) -> Result<Self, InitializationError> {
        let proxy = proxy.or(config.proxy.as_deref());
        Ok(Self {
            client: init_client(config, proxy)?,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Wraps an existing client. `user_agent` must be what the client sends.
    ///
    /// The client should not follow redirects itself, or cookies set on
    /// intermediate hops are lost.
    pub fn from_client(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, StepError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| step_error_from_reqwest(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| step_error_from_reqwest(&e))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StepError> {
        debug!("{} {} ({})", request.method, request.url, request.step);

        let mut request = request;
        let mut hop_cookies: Vec<String> = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let response = self.send_once(&request).await?;
            let location = match redirect_location(&response) {
                Some(location) => location.to_string(),
                None => {
                    let mut headers: Vec<(String, String)> = hop_cookies
                        .into_iter()
                        .map(|value| ("set-cookie".to_string(), value))
                        .collect();
                    headers.extend(response.headers);
                    return Ok(HttpResponse {
                        headers,
                        ..response
                    });
                }
            };

            let set_cookies: Vec<&str> = response.set_cookies().collect();
            request = next_hop(request, response.status, &location, &set_cookies)?;
            debug!("Following redirect to {} ({})", request.url, request.step);
            hop_cookies.extend(set_cookies.into_iter().map(str::to_string));
        }

        Err(redirect_error(format!(
            "more than {MAX_REDIRECTS} redirects from {}",
            request.url
        )))
    }

    fn client_identity(&self) -> &str {
        &self.user_agent
    }
}

fn redirect_error(message: String) -> StepError {
    StepError::Transport {
        kind: ErrorType::HttpRequestRedirectError,
        message,
    }
}

/// `Location` of a redirect response; `None` for anything else.
fn redirect_location(response: &HttpResponse) -> Option<&str> {
    match response.status {
        301 | 302 | 303 | 307 | 308 => response.header("location"),
        _ => None,
    }
}

/// Request for the hop a redirect points at.
///
/// 303 (and 301/302 after a POST) continue as a body-less GET, as browsers
/// do. Cookies only carry over while the host stays the same.
fn next_hop(
    mut request: HttpRequest,
    status: u16,
    location: &str,
    set_cookies: &[&str],
) -> Result<HttpRequest, StepError> {
    let current = Url::parse(&request.url)
        .map_err(|e| redirect_error(format!("{}: {e}", request.url)))?;
    let target = current
        .join(location)
        .map_err(|e| redirect_error(format!("bad Location '{location}': {e}")))?;

    let to_get = match status {
        303 => request.method != Method::HEAD,
        301 | 302 => request.method == Method::POST,
        _ => false,
    };
    if to_get {
        request.method = Method::GET;
        request.body = None;
        request.headers.retain(|(name, _)| {
            !name.eq_ignore_ascii_case("content-type")
                && !name.eq_ignore_ascii_case("content-length")
        });
    }

    let cookie = if current.host_str() == target.host_str() {
        merge_cookies(request.header("cookie"), set_cookies)
    } else {
        String::new()
    };
    request.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("cookie"));
    if !cookie.is_empty() {
        request.headers.push(("cookie".to_string(), cookie));
    }

    request.url = target.to_string();
    Ok(request)
}

/// `Cookie` header after applying `set_cookies` to `existing`.
fn merge_cookies(existing: Option<&str>, set_cookies: &[&str]) -> String {
    let mut jar = CookieJar::new();
    for pair in existing.unwrap_or_default().split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            jar.set(name.trim(), value.trim());
        }
    }
    for header in set_cookies {
        jar.absorb_set_cookie(header);
    }
    jar.header()
}
