use tokio::sync::mpsc;
use tracing::{debug, info};

use super::dialect::{Dialect, Endpoint};
use super::kind::ProviderKind;
use crate::models::{CompletionRequest, ModelInfo, StreamEvent};
use crate::transport::{HttpTransport, RetryPolicy};
use crate::utils::GatewayError;

/// Live health of a provider
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum HealthStatus {
    Online,
    Offline,
    Error { code: u16 },
}

/// A configured provider: dialect, address and transport in one place
#[derive(Debug, Clone)]
pub struct ProviderClient {
    kind: ProviderKind,
    dialect: Dialect,
    base_url: String,
    default_model: String,
    transport: HttpTransport,
}

impl ProviderClient {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, default_model: impl Into<String>, transport: HttpTransport) -> Self {
        Self {
            kind,
            dialect: Dialect::from(kind),
            base_url: base_url.into(),
            default_model: default_model.into(),
            transport,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_local(&self) -> bool {
        self.kind.is_local()
    }

    /// Usable at all: hosted dialects need credentials
    pub fn is_configured(&self) -> bool {
        !self.dialect.requires_api_key() || self.transport.has_api_key()
    }

    /// Copy of this client that makes exactly one attempt per call
    pub fn single_attempt(&self) -> Self {
        Self {
            transport: self.transport.with_retry(RetryPolicy::single()),
            ..self.clone()
        }
    }

    /// Unary completion through the configured retry policy
    pub async fn complete(&self, endpoint: Endpoint, request: &CompletionRequest) -> Result<String, GatewayError> {
        let url = self.dialect.url(&self.base_url, endpoint);
        let mut request = request.clone();
        request.stream = false;
        let body = self.dialect.build_request(endpoint, &request);

        debug!("Dispatching {:?} to {} ({}) with model {}", endpoint, self.kind, url, request.model);
        let reply = self.transport.post_json(&url, &body).await?;
        self.dialect.parse_response(endpoint, &reply)
    }

    /// Streamed completion; always finishes with `StreamEvent::End` unless
    /// the receiver was dropped
    pub async fn stream(&self, endpoint: Endpoint, request: &CompletionRequest, tx: mpsc::Sender<StreamEvent>) {
        let url = self.dialect.url(&self.base_url, endpoint);
        let mut request = request.clone();
        request.stream = true;
        let body = self.dialect.build_request(endpoint, &request);
        let dialect = self.dialect;

        debug!("Opening {:?} stream to {} ({}) with model {}", endpoint, self.kind, url, request.model);
        self.transport
            .stream_into(&url, &body, |line| dialect.parse_stream_line(endpoint, line), &tx)
            .await;
    }

    /// Fetch the served model list (single attempt)
    pub async fn fetch_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
        let url = self.dialect.models_url(&self.base_url);
        let body = self.transport.get_json(&url).await?;
        let models = self
            .dialect
            .parse_models(&body)
            .map_err(|e| GatewayError::ProviderUnavailable(format!("malformed model list: {}", e)))?;
        info!("Fetched {} models from {}", models.len(), self.kind);
        Ok(models)
    }

    /// Probe the dialect's health endpoint
    pub async fn health(&self) -> HealthStatus {
        let url = self.dialect.health_url(&self.base_url);
        match self.transport.probe(&url).await {
            Ok(code) if (200..300).contains(&code) => HealthStatus::Online,
            Ok(code) => HealthStatus::Error { code },
            Err(cause) => {
                debug!("Health probe of {} failed: {}", url, cause);
                HealthStatus::Offline
            }
        }
    }
}
