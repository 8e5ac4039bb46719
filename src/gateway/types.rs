use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ModelInfo;
use crate::provider::{HealthStatus, ProviderKind};

/// One metered request, emitted to the usage sink after completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub user_id: String,
    pub agent: Option<String>,
    pub prompt_tokens_estimate: u64,
    pub response_tokens_estimate: u64,
    pub credits_charged: u64,
    pub provider_used: ProviderKind,
    pub model: String,
    pub fallback_used: bool,
    pub timestamp: DateTime<Utc>,
}

/// Result of a completed chat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub model: String,
    pub provider: ProviderKind,
    pub fallback_used: bool,
    pub credits_charged: u64,
    /// Balance after the charge was applied
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatus {
    pub provider: ProviderKind,
    pub base_url: String,
    pub default_model: String,
    pub health: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelsListing {
    pub models: Vec<ModelInfo>,
    pub default_model: String,
}

/// Operator diagnostics from a minimal round trip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Where a chat ended up in the dispatch state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Admitted,
    ContextBuilt,
    Dispatched,
    FallbackDispatched,
    Completed,
    Failed,
    Recorded,
}

impl ChatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatState::Admitted => "admitted",
            ChatState::ContextBuilt => "context_built",
            ChatState::Dispatched => "dispatched",
            ChatState::FallbackDispatched => "fallback_dispatched",
            ChatState::Completed => "completed",
            ChatState::Failed => "failed",
            ChatState::Recorded => "recorded",
        }
    }
}
