use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::billing::{BillingPolicy, Charge};
use super::ledger::{CreditLedger, InMemoryLedger, InMemoryUsageLog, JsonlUsageLog, UsageSink};
use super::types::{ChatOutcome, ChatState, ConnectionTest, GatewayStatus, ModelsListing, UsageRecord};
use crate::agents::find_agent;
use crate::app::Config;
use crate::constants::CONNECTION_TEST_PROMPT;
use crate::context::ContextAssembler;
use crate::limits::RateLimiter;
use crate::models::{ChatMessage, ChatRequest, CompletionRequest, GenerateRequest, StreamEvent};
use crate::provider::{Endpoint, ProviderClient};
use crate::registry::ModelRegistry;
use crate::transport::{HttpTransport, RetryPolicy};
use crate::utils::{count_chars, GatewayError};

/// A dispatch target chosen for one request
struct Route<'a> {
    client: &'a ProviderClient,
    model: String,
    free: bool,
}

/// Successful dispatch, before metering
struct Dispatch {
    response: String,
    model: String,
    client_kind: crate::provider::ProviderKind,
    fallback_used: bool,
    free: bool,
}

/// Entry point for every caller operation.
///
/// Owns the process-wide shared state (model cache, rate-limit buckets) and
/// the collaborator seams. Construct once and share behind an `Arc`.
pub struct Gateway {
    config: Config,
    primary: Arc<ProviderClient>,
    /// Cloud provider for callers that opt out of local inference
    cloud: Option<ProviderClient>,
    /// Same cloud provider, one attempt per call
    fallback: Option<ProviderClient>,
    registry: ModelRegistry,
    limiter: Arc<RateLimiter>,
    assembler: ContextAssembler,
    billing: BillingPolicy,
    ledger: Arc<dyn CreditLedger>,
    usage: Arc<dyn UsageSink>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("primary", &self.primary.kind())
            .field("base_url", &self.primary.base_url())
            .field("fallback", &self.fallback.as_ref().map(|c| c.kind()))
            .finish()
    }
}

impl Gateway {
    /// Build a gateway with the in-process ledger and the configured usage sink
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let ledger: Arc<dyn CreditLedger> = Arc::new(InMemoryLedger::new(config.billing.starting_credits));
        let usage: Arc<dyn UsageSink> = match &config.billing.usage_log {
            Some(path) => Arc::new(JsonlUsageLog::new(path.clone())),
            None => Arc::new(InMemoryUsageLog::new()),
        };
        Self::new(config, ledger, usage)
    }

    pub fn new(config: Config, ledger: Arc<dyn CreditLedger>, usage: Arc<dyn UsageSink>) -> Result<Self, GatewayError> {
        let llm = &config.llm;
        let retry = RetryPolicy::new(llm.retry_attempts, llm.retry_delay());

        let transport = HttpTransport::new(llm.timeout(), retry, llm.api_key.clone())?;
        let primary = Arc::new(ProviderClient::new(
            llm.kind(),
            llm.base_url(),
            llm.default_model.clone(),
            transport,
        ));

        if !primary.is_configured() {
            warn!("{} at {} needs an API key; requests will be rejected upstream", primary.kind(), primary.base_url());
        }

        let cloud = if config.fallback.is_usable() {
            let fb = &config.fallback;
            let transport = HttpTransport::new(llm.timeout(), retry, fb.api_key.clone())?;
            Some(ProviderClient::new(
                fb.kind(),
                fb.base_url.trim_end_matches('/'),
                fb.model.clone(),
                transport,
            ))
        } else {
            None
        };
        let fallback = cloud.as_ref().map(ProviderClient::single_attempt);

        info!(
            "Gateway ready: {} at {} (model {}), cloud fallback {}",
            primary.kind(),
            primary.base_url(),
            primary.default_model(),
            if fallback.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            registry: ModelRegistry::new(primary.clone(), llm.models_cache_ttl()),
            limiter: Arc::new(RateLimiter::per_minute(config.limits.max_requests_per_minute)),
            assembler: ContextAssembler::new(llm.context_window, config.limits.history_messages),
            billing: BillingPolicy::new(&config.billing),
            primary,
            cloud,
            fallback,
            ledger,
            usage,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared limiter, for the periodic bucket sweep
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// Provider identity plus a live health probe
    pub async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            provider: self.primary.kind(),
            base_url: self.primary.base_url().to_string(),
            default_model: self.primary.default_model().to_string(),
            health: self.primary.health().await,
        }
    }

    pub async fn models(&self, force_refresh: bool) -> ModelsListing {
        ModelsListing {
            models: self.registry.list_models(force_refresh).await,
            default_model: self.registry.default_model().to_string(),
        }
    }

    /// Fire a fixed minimal prompt with a single attempt
    pub async fn test_connection(&self) -> ConnectionTest {
        let client = self.primary.single_attempt();
        let request = self.completion(
            client.default_model().to_string(),
            vec![ChatMessage::user(CONNECTION_TEST_PROMPT)],
            None,
            None,
        );

        match client.complete(Endpoint::Generate, &request).await {
            Ok(response) => ConnectionTest {
                success: true,
                message: format!("Connected to {} at {}", client.kind(), client.base_url()),
                response: Some(response.trim().to_string()),
            },
            Err(e) => ConnectionTest {
                success: false,
                message: e.to_string(),
                response: None,
            },
        }
    }

    /// Single-shot generation against the primary provider. Not metered.
    pub async fn generate(&self, user_id: &str, request: &GenerateRequest) -> Result<String, GatewayError> {
        let completion = self.admit_generate(user_id, request)?;
        self.primary.complete(Endpoint::Generate, &completion).await
    }

    /// Streamed generation. The returned channel yields deltas in receipt
    /// order and always finishes with `StreamEvent::End`; dropping it
    /// aborts the upstream request.
    pub fn generate_stream(
        &self,
        user_id: &str,
        request: &GenerateRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, GatewayError> {
        let completion = self.admit_generate(user_id, request)?;
        let (tx, rx) = mpsc::channel(self.config.server.stream_buffer.max(1));
        let client = self.primary.clone();

        tokio::spawn(async move {
            client.stream(Endpoint::Generate, &completion, tx).await;
        });

        Ok(rx)
    }

    /// Persona chat with admission, credit gate, fallback and metering
    pub async fn chat(&self, user_id: &str, request: &ChatRequest) -> Result<ChatOutcome, GatewayError> {
        let request_id = Uuid::new_v4();

        // Admit
        let agent = find_agent(&request.agent)?;
        self.check_prompt_size(&request.message)?;
        self.check_rate(user_id)?;
        let route = self.route(request);
        if !route.free {
            let balance = self.ledger.balance(user_id).await?;
            let required = self.billing.min_credits_for_chat();
            if balance < required {
                info!(%request_id, user_id, balance, required, "chat rejected: insufficient credits");
                return Err(GatewayError::InsufficientCredits { balance, required });
            }
        }
        self.transition(request_id, ChatState::Admitted);

        // Build context
        let user_message = match &request.project_context {
            Some(context) => context.wrap_message(&request.message),
            None => request.message.clone(),
        };
        let messages = self
            .assembler
            .assemble(Some(agent.system_prompt), &request.history, &user_message);
        self.transition(request_id, ChatState::ContextBuilt);

        // Dispatch
        let dispatch = self.dispatch(request_id, request, route, messages).await;
        let dispatch = match dispatch {
            Ok(dispatch) => dispatch,
            Err(e) => {
                self.transition(request_id, ChatState::Failed);
                return Err(e);
            }
        };
        self.transition(request_id, ChatState::Completed);

        // Record
        let free = dispatch.free || dispatch.fallback_used;
        let charge = self.billing.charge(&request.message, &dispatch.response, free);
        let balance = self.settle(user_id, &charge).await?;
        self.record_usage(user_id, Some(agent.id), &dispatch, &charge).await;
        self.transition(request_id, ChatState::Recorded);

        Ok(ChatOutcome {
            response: dispatch.response,
            model: dispatch.model,
            provider: dispatch.client_kind,
            fallback_used: dispatch.fallback_used,
            credits_charged: charge.credits,
            balance,
        })
    }

    fn admit_generate(&self, user_id: &str, request: &GenerateRequest) -> Result<CompletionRequest, GatewayError> {
        self.check_prompt_size(&request.prompt)?;
        self.check_rate(user_id)?;

        let messages = self
            .assembler
            .assemble(request.system_prompt.as_deref(), &[], &request.prompt);
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.primary.default_model().to_string());
        Ok(self.completion(model, messages, request.temperature, request.max_tokens))
    }

    fn check_prompt_size(&self, prompt: &str) -> Result<(), GatewayError> {
        let size = count_chars(prompt);
        let limit = self.config.limits.max_prompt_chars;
        if size > limit {
            debug!("Rejecting prompt of {} characters (limit {})", size, limit);
            return Err(GatewayError::PromptTooLarge { size, limit });
        }
        Ok(())
    }

    fn check_rate(&self, user_id: &str) -> Result<(), GatewayError> {
        if self.limiter.admit(user_id) {
            Ok(())
        } else {
            warn!("Rate limit exceeded for user {}", user_id);
            Err(GatewayError::RateLimited(user_id.to_string()))
        }
    }

    /// Pick the provider for a chat. Callers that opt out of local
    /// inference go to the cloud provider when one is configured.
    fn route(&self, request: &ChatRequest) -> Route<'_> {
        let client = match (&self.cloud, request.prefer_local) {
            (Some(cloud), false) => cloud,
            _ => self.primary.as_ref(),
        };
        Route {
            client,
            model: request
                .model
                .clone()
                .unwrap_or_else(|| client.default_model().to_string()),
            free: self.billing.is_free(client.is_local()),
        }
    }

    async fn dispatch(
        &self,
        request_id: Uuid,
        request: &ChatRequest,
        route: Route<'_>,
        messages: Vec<ChatMessage>,
    ) -> Result<Dispatch, GatewayError> {
        let client = route.client;
        let completion = self.completion(route.model, messages, request.temperature, request.max_tokens);

        self.transition(request_id, ChatState::Dispatched);
        let cause = match client.complete(Endpoint::Chat, &completion).await {
            Ok(response) => {
                return Ok(Dispatch {
                    response,
                    model: completion.model,
                    client_kind: client.kind(),
                    fallback_used: false,
                    free: route.free,
                })
            }
            Err(e) => e,
        };

        let fallback = match &self.fallback {
            Some(fallback) if request.prefer_local && client.is_local() => fallback,
            _ => {
                warn!(%request_id, "Dispatch to {} failed with no fallback: {}", client.kind(), cause);
                return Err(GatewayError::ServiceUnavailable);
            }
        };

        warn!(
            %request_id,
            "Dispatch to {} failed ({}), falling back to {}",
            client.kind(),
            cause,
            fallback.kind()
        );
        self.transition(request_id, ChatState::FallbackDispatched);

        let completion = CompletionRequest {
            model: fallback.default_model().to_string(),
            ..completion
        };
        match fallback.complete(Endpoint::Chat, &completion).await {
            Ok(response) => Ok(Dispatch {
                response,
                model: completion.model,
                client_kind: fallback.kind(),
                fallback_used: true,
                free: true,
            }),
            Err(e) => {
                error!(%request_id, "Fallback to {} failed: {}", fallback.kind(), e);
                Err(GatewayError::ServiceUnavailable)
            }
        }
    }

    /// Apply the charge and return the resulting balance
    async fn settle(&self, user_id: &str, charge: &Charge) -> Result<i64, GatewayError> {
        if charge.credits == 0 {
            return self.ledger.balance(user_id).await;
        }
        let delta = -(charge.credits as i64);
        let balance = self.ledger.apply_delta(user_id, delta).await?;
        debug!("Charged {} credits to {}, balance now {}", charge.credits, user_id, balance);
        Ok(balance)
    }

    async fn record_usage(&self, user_id: &str, agent: Option<&str>, dispatch: &Dispatch, charge: &Charge) {
        let record = UsageRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            agent: agent.map(str::to_string),
            prompt_tokens_estimate: charge.prompt_tokens,
            response_tokens_estimate: charge.response_tokens,
            credits_charged: charge.credits,
            provider_used: dispatch.client_kind,
            model: dispatch.model.clone(),
            fallback_used: dispatch.fallback_used,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.usage.record(record).await {
            error!("Failed to record usage for {}: {}", user_id, e);
        }
    }

    fn completion(
        &self,
        model: String,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> CompletionRequest {
        let llm = &self.config.llm;
        CompletionRequest {
            model,
            messages,
            temperature: temperature.unwrap_or(llm.temperature),
            max_tokens: max_tokens.unwrap_or(llm.max_tokens),
            context_window: llm.context_window,
            stream: false,
        }
    }

    fn transition(&self, request_id: Uuid, state: ChatState) {
        debug!(%request_id, state = state.as_str(), "chat state");
    }
}
