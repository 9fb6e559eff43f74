//! HTTP transport collaborator.
//!
//! The engine never talks to `reqwest` directly: every call goes through the
//! [`Transport`] trait so tests can script responses and observe call order.

mod reqwest_transport;

use async_trait::async_trait;
use reqwest::Method;

use crate::engine::StepName;
use crate::error_handling::StepError;

pub use reqwest_transport::ReqwestTransport;

/// One outgoing call.
///
/// Headers are an ordered list and are sent in this order.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Step the call belongs to (diagnostics and test routing only)
    pub step: StepName,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(step: StepName, url: impl Into<String>) -> Self {
        Self {
            step,
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(step: StepName, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            step,
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Appends headers, keeping their order.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends or replaces one header (case-insensitive name match).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request body as text (lossy), for logging and assertions.
    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

/// A response, whatever its status.
///
/// The body is exactly what came over the wire; decompression is left to the
/// response decoder.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every `Set-Cookie` header, in arrival order.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends HTTP calls on behalf of one scrape.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `StepError::Transport` when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StepError>;

    /// Client identity string negotiated with the server (the User-Agent).
    fn client_identity(&self) -> &str;

    /// Whether independent calls may be issued together.
    fn supports_pipelining(&self) -> bool {
        false
    }
}
