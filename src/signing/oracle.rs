//! Signing oracle collaborators.
//!
//! Both signatures come from code that only runs inside the real page. The
//! engine treats them as opaque functions; a failure only omits a header.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::REQUEST_TIMEOUT_SECS;
use crate::error_handling::OracleError;

/// Produces the `token` header for a token payload.
#[async_trait]
pub trait TokenOracle: Send + Sync {
    async fn sign_token(&self, payload: &Value) -> Result<String, OracleError>;
}

/// Produces the `w-payload-source` header for a w-payload digest.
#[async_trait]
pub trait WPayloadOracle: Send + Sync {
    async fn sign_digest(&self, digest: &str, client_identity: &str)
        -> Result<String, OracleError>;
}

/// Oracle that is never available. Every scrape runs in degraded mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOracle;

#[async_trait]
impl TokenOracle for NoopOracle {
    async fn sign_token(&self, _payload: &Value) -> Result<String, OracleError> {
        Err(OracleError::Failed("no token signer configured".to_string()))
    }
}

#[async_trait]
impl WPayloadOracle for NoopOracle {
    async fn sign_digest(
        &self,
        _digest: &str,
        _client_identity: &str,
    ) -> Result<String, OracleError> {
        Err(OracleError::Failed("no w-payload signer configured".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SignerReply {
    value: Option<String>,
}

/// Oracle backed by an external signer service.
///
/// POSTs `{"kind":"token","payload":..}` or
/// `{"kind":"w-payload-source","digest":..,"clientIdentity":..}` and expects
/// `{"value":".."}` back.
#[derive(Debug, Clone)]
pub struct HttpSigningOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSigningOracle {
    /// # Errors
    ///
    /// Returns `OracleError::Failed` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn request(&self, body: Value) -> Result<String, OracleError> {
        let body = serde_json::to_vec(&body).map_err(|e| OracleError::Failed(e.to_string()))?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| OracleError::Failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Failed(format!("signer answered HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| OracleError::Failed(e.to_string()))?;
        let reply: SignerReply =
            serde_json::from_slice(&bytes).map_err(|e| OracleError::Failed(e.to_string()))?;
        match reply.value {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(OracleError::Empty),
        }
    }
}

#[async_trait]
impl TokenOracle for HttpSigningOracle {
    async fn sign_token(&self, payload: &Value) -> Result<String, OracleError> {
        debug!("Requesting token signature from {}", self.endpoint);
        self.request(json!({"kind": "token", "payload": payload}))
            .await
    }
}

#[async_trait]
impl WPayloadOracle for HttpSigningOracle {
    async fn sign_digest(
        &self,
        digest: &str,
        client_identity: &str,
    ) -> Result<String, OracleError> {
        debug!("Requesting w-payload-source for digest {digest}");
        self.request(json!({
            "kind": "w-payload-source",
            "digest": digest,
            "clientIdentity": client_identity,
        }))
        .await
    }
}
