//! CA relay
//!
//! Forwards a revocation request to one of the allow-listed CAs, then feeds
//! the submission the CA answers with through the engine like any other.
//!
//! The outbound call is the logger's only blocking external I/O. It runs
//! under an explicit timeout and no bucket lock is held while it is in
//! flight; every network or decoding failure is returned to the caller.

use async_trait::async_trait;
use revocation_core::{
    RevocationError, RevocationSubmission, SignedRevocationDigest, TransportEnvelope,
    ENVELOPE_VERSION,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{Engine, LoggerError};
use crate::keys::CaEntity;

/// Path a CA serves revocation requests on, relative to its base URL
pub const REVOKE_PATH: &str = "/ct/v1/revoke-and-produce-srd";

/// Default bound on a CA call
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Request to revoke, forwarded to the chosen CA as-is
///
/// The logger only reads the category, for its logs; any other fields are
/// the CA's business and pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevokeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_type: Option<String>,

    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// What a CA may answer with: a bare submission or one in an envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaResponse {
    Envelope(TransportEnvelope),
    Submission(RevocationSubmission),
}

impl CaResponse {
    fn into_submission(self) -> Result<RevocationSubmission, LoggerError> {
        match self {
            CaResponse::Envelope(envelope) if envelope.version != ENVELOPE_VERSION => Err(
                LoggerError::MalformedRequest(
                    RevocationError::UnsupportedVersion(envelope.version).to_string(),
                ),
            ),
            CaResponse::Envelope(envelope) => envelope
                .into_submission()
                .map_err(|e| LoggerError::MalformedRequest(e.to_string())),
            CaResponse::Submission(submission) => Ok(submission),
        }
    }
}

/// Outbound call to a CA's revocation endpoint
#[async_trait]
pub trait CaClient: Send + Sync + Debug {
    /// Ask `ca` to revoke and return the submission it produced
    async fn revoke(
        &self,
        ca: &CaEntity,
        request: &RevokeRequest,
    ) -> Result<RevocationSubmission, LoggerError>;
}

/// HTTP client for CA revocation endpoints
#[derive(Debug, Clone)]
pub struct HttpCaClient {
    client: reqwest::Client,
}

impl HttpCaClient {
    /// Build a client whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CaClient for HttpCaClient {
    async fn revoke(
        &self,
        ca: &CaEntity,
        request: &RevokeRequest,
    ) -> Result<RevocationSubmission, LoggerError> {
        let url = format!("{}{}", ca.url.trim_end_matches('/'), REVOKE_PATH);

        // CAs take the request as a JSON body on GET
        let response = self
            .client
            .get(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                LoggerError::UpstreamUnavailable(format!("Failed to reach CA at {}: {}", url, e))
            })?;

        if !response.status().is_success() {
            return Err(LoggerError::UpstreamUnavailable(format!(
                "CA {} returned error: {}",
                ca.id,
                response.status()
            )));
        }

        let body: CaResponse = response.json().await.map_err(|e| {
            LoggerError::MalformedRequest(format!("Invalid response from CA {}: {}", ca.id, e))
        })?;

        body.into_submission()
    }
}

/// Relays revocation requests to CAs and ingests their answers
#[derive(Debug, Clone)]
pub struct CaRelay {
    engine: Engine,
    client: Arc<dyn CaClient>,
    timeout: Duration,
}

impl CaRelay {
    pub fn new(engine: Engine, client: Arc<dyn CaClient>, timeout: Duration) -> Self {
        Self {
            engine,
            client,
            timeout,
        }
    }

    /// Pick a CA, have it revoke, and ingest the resulting submission
    pub async fn relay(
        &self,
        request: &RevokeRequest,
    ) -> Result<SignedRevocationDigest, LoggerError> {
        let ca = self
            .engine
            .registry()
            .random_entity()
            .cloned()
            .ok_or_else(|| {
                warn!("No CA available to relay a revocation request to");
                LoggerError::UpstreamUnavailable("No CAs to forward the request to".into())
            })?;

        let relay_id = Uuid::new_v4();
        info!(
            relay_id = %relay_id,
            ca_id = %ca.id,
            url = %ca.url,
            revocation_type = ?request.revocation_type,
            "Relaying revocation request"
        );

        let submission = match tokio::time::timeout(self.timeout, self.client.revoke(&ca, request))
            .await
        {
            Ok(Ok(submission)) => submission,
            Ok(Err(err)) => {
                warn!(relay_id = %relay_id, ca_id = %ca.id, error = %err, "CA call failed");
                return Err(err);
            }
            Err(_) => {
                warn!(relay_id = %relay_id, ca_id = %ca.id, "CA call timed out");
                return Err(LoggerError::UpstreamUnavailable(format!(
                    "CA {} did not answer within {:?}",
                    ca.id, self.timeout
                )));
            }
        };

        if submission.ca_id() != ca.id {
            warn!(
                relay_id = %relay_id,
                asked = %ca.id,
                answered = %submission.ca_id(),
                "CA answered with a submission for another CA"
            );
        }

        let srd = self.engine.ingest(&submission)?;
        info!(relay_id = %relay_id, ca_id = %srd.digest.ca_id, "Relayed revocation ingested");
        Ok(srd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{CaRegistry, LoggerIdentity, SelectionPolicy};
    use crate::storage::MemoryStore;
    use parking_lot::Mutex;
    use revocation_core::{Crv, HashAlgorithm, KeyPair, RunLengthCodec};

    /// Answers with a canned submission and records what it was asked
    #[derive(Debug)]
    struct FakeCaClient {
        answer: Result<RevocationSubmission, LoggerError>,
        seen: Mutex<Vec<(String, RevokeRequest)>>,
    }

    #[async_trait]
    impl CaClient for FakeCaClient {
        async fn revoke(
            &self,
            ca: &CaEntity,
            request: &RevokeRequest,
        ) -> Result<RevocationSubmission, LoggerError> {
            self.seen.lock().push((ca.id.clone(), request.clone()));
            self.answer.clone()
        }
    }

    #[derive(Debug)]
    struct SlowCaClient;

    #[async_trait]
    impl CaClient for SlowCaClient {
        async fn revoke(
            &self,
            _ca: &CaEntity,
            _request: &RevokeRequest,
        ) -> Result<RevocationSubmission, LoggerError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(LoggerError::Internal("unreachable".into()))
        }
    }

    fn engine_with(ca_key: &KeyPair, allow: Option<&[String]>) -> Engine {
        let registry = CaRegistry::new(
            vec![CaEntity {
                id: ca_key.kid().into(),
                public_key: ca_key.public_key(),
                url: "http://ca.example/".into(),
                operator: "op".into(),
            }],
            allow,
            SelectionPolicy::Flat,
        );
        Engine::new(
            Arc::new(registry),
            Arc::new(MemoryStore::new()),
            Arc::new(LoggerIdentity::generate("log-1")),
        )
    }

    fn valid_submission(ca_key: &KeyPair) -> RevocationSubmission {
        let crv = Crv::from_positions(&[1, 3]);
        RevocationSubmission::create(
            ca_key,
            "Let's-Revoke",
            &crv,
            &crv,
            5,
            HashAlgorithm::Sha256,
            &RunLengthCodec,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_relay_ingests_ca_answer() {
        let ca_key = KeyPair::generate("ca-x");
        let engine = engine_with(&ca_key, None);
        let client = Arc::new(FakeCaClient {
            answer: Ok(valid_submission(&ca_key)),
            seen: Mutex::new(Vec::new()),
        });
        let relay = CaRelay::new(engine.clone(), client.clone(), DEFAULT_RELAY_TIMEOUT);

        let request: RevokeRequest =
            serde_json::from_str(r#"{"revocation_type":"Let's-Revoke","serial":"0a"}"#).unwrap();
        let srd = relay.relay(&request).await.unwrap();

        srd.verify(&engine.identity().public_key()).unwrap();
        assert_eq!(engine.bucket("ca-x", "Let's-Revoke").unwrap().to_string(), "00001010");

        // Extra request fields reach the CA untouched
        let seen = client.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "ca-x");
        assert_eq!(seen[0].1.extensions["serial"], "0a");
    }

    #[tokio::test]
    async fn test_empty_pool_is_upstream_unavailable() {
        let ca_key = KeyPair::generate("ca-x");
        let nobody: Vec<String> = Vec::new();
        let engine = engine_with(&ca_key, Some(nobody.as_slice()));
        let client = Arc::new(FakeCaClient {
            answer: Ok(valid_submission(&ca_key)),
            seen: Mutex::new(Vec::new()),
        });
        let relay = CaRelay::new(engine, client.clone(), DEFAULT_RELAY_TIMEOUT);

        let err = relay.relay(&RevokeRequest::default()).await.unwrap_err();
        assert!(matches!(err, LoggerError::UpstreamUnavailable(_)));
        assert!(client.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_ca_failure_is_returned_not_fatal() {
        let ca_key = KeyPair::generate("ca-x");
        let engine = engine_with(&ca_key, None);
        let client = Arc::new(FakeCaClient {
            answer: Err(LoggerError::UpstreamUnavailable("connection refused".into())),
            seen: Mutex::new(Vec::new()),
        });
        let relay = CaRelay::new(engine.clone(), client, DEFAULT_RELAY_TIMEOUT);

        let err = relay.relay(&RevokeRequest::default()).await.unwrap_err();
        assert_eq!(err, LoggerError::UpstreamUnavailable("connection refused".into()));
        assert_eq!(engine.store().bucket_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_ca_times_out() {
        let ca_key = KeyPair::generate("ca-x");
        let relay = CaRelay::new(
            engine_with(&ca_key, None),
            Arc::new(SlowCaClient),
            Duration::from_millis(50),
        );

        let err = relay.relay(&RevokeRequest::default()).await.unwrap_err();
        assert!(matches!(err, LoggerError::UpstreamUnavailable(msg) if msg.contains("did not answer")));
    }

    #[tokio::test]
    async fn test_forged_ca_answer_rejected() {
        let ca_key = KeyPair::generate("ca-x");
        let impostor = KeyPair::generate("ca-x");
        let engine = engine_with(&ca_key, None);
        let client = Arc::new(FakeCaClient {
            answer: Ok(valid_submission(&impostor)),
            seen: Mutex::new(Vec::new()),
        });
        let relay = CaRelay::new(engine.clone(), client, DEFAULT_RELAY_TIMEOUT);

        let err = relay.relay(&RevokeRequest::default()).await.unwrap_err();
        assert!(matches!(err, LoggerError::InvalidSignature(_)));
        assert!(engine.bucket("ca-x", "Let's-Revoke").is_none());
    }

    #[test]
    fn test_ca_response_accepts_bare_or_enveloped_submission() {
        let ca_key = KeyPair::generate("ca-x");
        let submission = valid_submission(&ca_key);

        let bare = serde_json::to_string(&submission).unwrap();
        let parsed: CaResponse = serde_json::from_str(&bare).unwrap();
        assert_eq!(parsed.into_submission().unwrap(), submission);

        let wrapped = serde_json::to_string(&TransportEnvelope::wrap(submission.clone())).unwrap();
        let parsed: CaResponse = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(parsed.into_submission().unwrap(), submission);
    }

    #[test]
    fn test_ca_envelope_with_unknown_version_rejected() {
        let ca_key = KeyPair::generate("ca-x");
        let mut envelope = TransportEnvelope::wrap(valid_submission(&ca_key));
        envelope.version = 9;

        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: CaResponse = serde_json::from_str(&json).unwrap();
        let err = parsed.into_submission().unwrap_err();
        assert!(matches!(err, LoggerError::MalformedRequest(msg) if msg.contains('9')));
    }

    /// Serve a stand-in CA on a local port and return its address
    async fn serve_ca(router: axum::Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn ca_at(url: String) -> CaEntity {
        CaEntity {
            id: "ca-x".into(),
            public_key: KeyPair::generate("ca-x").public_key(),
            url,
            operator: "op".into(),
        }
    }

    #[tokio::test]
    async fn test_http_client_maps_ca_failures() {
        use axum::{http::StatusCode, routing::get};

        let router = axum::Router::new()
            .route(
                &format!("/failing{}", REVOKE_PATH),
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(&format!("/garbage{}", REVOKE_PATH), get(|| async { "not json" }));
        let addr = serve_ca(router).await;

        // Nothing listens on a port freed right after binding it
        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let client = HttpCaClient::new(Duration::from_secs(5)).unwrap();
        let request = RevokeRequest::default();

        let err = client
            .revoke(&ca_at(format!("http://{}/failing", addr)), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::UpstreamUnavailable(msg) if msg.contains("500")));

        let err = client
            .revoke(&ca_at(format!("http://{}/garbage/", addr)), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::MalformedRequest(_)));

        let err = client
            .revoke(&ca_at(format!("http://{}", closed)), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::UpstreamUnavailable(msg) if msg.contains("Failed to reach CA")));
    }

    #[tokio::test]
    async fn test_http_client_decodes_ca_submission() {
        use axum::{routing::get, Json};

        let ca_key = KeyPair::generate("ca-x");
        let submission = valid_submission(&ca_key);
        let answer = TransportEnvelope::wrap(submission.clone());
        let router = axum::Router::new().route(
            REVOKE_PATH,
            get(move || {
                let answer = answer.clone();
                async move { Json(answer) }
            }),
        );
        let addr = serve_ca(router).await;

        let client = HttpCaClient::new(Duration::from_secs(5)).unwrap();
        let got = client
            .revoke(&ca_at(format!("http://{}", addr)), &RevokeRequest::default())
            .await
            .unwrap();
        assert_eq!(got, submission);
    }
}
