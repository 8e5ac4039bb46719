use crate::app::BillingConfig;
use crate::utils::Tokenizer;

/// Token estimates and credits for one completed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
    pub credits: u64,
}

/// Credit policy derived from the billing section
#[derive(Debug, Clone)]
pub struct BillingPolicy {
    tokenizer: Tokenizer,
    credits_per_1k_tokens: f64,
    local_billable: bool,
    min_credits_for_chat: i64,
}

impl BillingPolicy {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.tokens_per_word),
            credits_per_1k_tokens: config.credits_per_1k_tokens,
            local_billable: config.local_billable,
            min_credits_for_chat: config.min_credits_for_chat,
        }
    }

    /// Whether a dispatch to this kind of provider is free
    pub fn is_free(&self, local: bool) -> bool {
        local && !self.local_billable
    }

    pub fn min_credits_for_chat(&self) -> i64 {
        self.min_credits_for_chat
    }

    /// Meter an exchange. Billable exchanges cost at least one credit.
    pub fn charge(&self, prompt: &str, response: &str, free: bool) -> Charge {
        let prompt_tokens = self.tokenizer.estimate_tokens(prompt);
        let response_tokens = self.tokenizer.estimate_tokens(response);

        let credits = if free {
            0
        } else {
            let tokens = (prompt_tokens + response_tokens) as f64;
            let raw = (tokens / 1000.0 * self.credits_per_1k_tokens).ceil() as u64;
            raw.max(1)
        };

        Charge {
            prompt_tokens,
            response_tokens,
            credits,
        }
    }
}
