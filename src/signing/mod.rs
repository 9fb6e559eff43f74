//! Token and signature assembly.
//!
//! This module provides:
//! - The oracle collaborators (`TokenOracle`, `WPayloadOracle`)
//! - The locally computed `x-ctx-wclient-req` digest
//! - [`assemble`], which turns the token payload and the w-payload into the
//!   three auth headers of the main search

mod oracle;
mod wclient;

use std::sync::Arc;

use log::{debug, warn};

use crate::error_handling::OracleError;
use crate::payload::{TokenPayload, WPayload};

pub use oracle::{HttpSigningOracle, NoopOracle, TokenOracle, WPayloadOracle};
pub use wclient::{wclient_req, wclient_req_for};

/// The pair of oracles a scrape signs with.
#[derive(Clone)]
pub struct Signers {
    pub token: Arc<dyn TokenOracle>,
    pub w_payload: Arc<dyn WPayloadOracle>,
}

impl Signers {
    /// One object serving both oracles.
    pub fn shared<O>(oracle: O) -> Self
    where
        O: TokenOracle + WPayloadOracle + 'static,
    {
        let oracle = Arc::new(oracle);
        Self {
            token: oracle.clone(),
            w_payload: oracle,
        }
    }

    /// No signers: every scrape runs in degraded mode.
    pub fn none() -> Self {
        Self::shared(NoopOracle)
    }
}

impl std::fmt::Debug for Signers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signers").finish_non_exhaustive()
    }
}

/// Auth headers of the main search. Oracle headers are `None` when their
/// oracle failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedHeaders {
    pub token: Option<String>,
    pub w_payload_source: Option<String>,
    pub w_payload_digest: String,
    pub wclient_req: String,
}

/// Runs both oracles concurrently and combines their answers with the local
/// `x-ctx-wclient-req` value. Never fails: an oracle failure is logged and its
/// header omitted.
pub async fn assemble(
    signers: &Signers,
    token_payload: &TokenPayload,
    w_payload: &WPayload,
    client_identity: &str,
    wclient_req: String,
) -> SignedHeaders {
    let digest = match w_payload.digest() {
        Ok(digest) => digest,
        Err(e) => {
            warn!("Could not serialize w-payload, skipping its signature: {e}");
            String::new()
        }
    };
    debug!("w-payload digest: {digest}");

    let token_input = serde_json::to_value(token_payload);
    let token_fut = async {
        match &token_input {
            Ok(value) => signers.token.sign_token(value).await,
            Err(e) => Err(OracleError::Failed(e.to_string())),
        }
    };
    let w_fut = async {
        if digest.is_empty() {
            Err(OracleError::Empty)
        } else {
            signers.w_payload.sign_digest(&digest, client_identity).await
        }
    };
    let (token, w_payload_source) = futures::join!(token_fut, w_fut);

    let token = token
        .map_err(|e| warn!("Token oracle unavailable, sending without token header: {e}"))
        .ok();
    let w_payload_source = w_payload_source
        .map_err(|e| warn!("w-payload-source oracle unavailable, sending without it: {e}"))
        .ok();

    SignedHeaders {
        token,
        w_payload_source,
        w_payload_digest: digest,
        wclient_req,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::entropy::{Entropy, FixedClock};
    use crate::payload::fixtures::{batch, parsed, session, ROUND_TRIP_URL};
    use crate::payload::{build_token_payload, build_w_payload, PayloadContext, SearchOptions};

    #[derive(Default)]
    struct EchoOracle {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TokenOracle for EchoOracle {
        async fn sign_token(&self, payload: &Value) -> Result<String, OracleError> {
            self.seen.lock().expect("lock").push("token".to_string());
            Ok(format!("token-for-mode-{}", payload["mode"]))
        }
    }

    #[async_trait]
    impl WPayloadOracle for EchoOracle {
        async fn sign_digest(
            &self,
            digest: &str,
            client_identity: &str,
        ) -> Result<String, OracleError> {
            self.seen.lock().expect("lock").push(client_identity.to_string());
            Ok(format!("w-{digest}"))
        }
    }

    async fn run(signers: &Signers) -> SignedHeaders {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let mut entropy = Entropy::seeded(4, Arc::new(FixedClock::at_millis(1_767_225_600_000)));
        let token_payload = build_token_payload(&ctx, &SearchOptions::default());
        let w_payload = build_w_payload(&ctx, &mut entropy);
        assemble(signers, &token_payload, &w_payload, "Mozilla/5.0 test", "wc".to_string()).await
    }

    #[tokio::test]
    async fn test_assemble_with_working_oracles() {
        let oracle = Arc::new(EchoOracle::default());
        let signers = Signers {
            token: oracle.clone(),
            w_payload: oracle.clone(),
        };
        let headers = run(&signers).await;
        assert_eq!(headers.token.as_deref(), Some("token-for-mode-0"));
        assert_eq!(
            headers.w_payload_source,
            Some(format!("w-{}", headers.w_payload_digest))
        );
        assert_eq!(headers.w_payload_digest.len(), 32);
        assert_eq!(headers.wclient_req, "wc");
        assert!(oracle
            .seen
            .lock()
            .expect("lock")
            .contains(&"Mozilla/5.0 test".to_string()));
    }

    #[tokio::test]
    async fn test_assemble_degrades_without_oracles() {
        let headers = run(&Signers::none()).await;
        assert_eq!(headers.token, None);
        assert_eq!(headers.w_payload_source, None);
        assert_eq!(headers.w_payload_digest.len(), 32);
        assert_eq!(headers.wclient_req, "wc");
    }
}
