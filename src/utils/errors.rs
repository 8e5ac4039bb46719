use thiserror::Error;

/// Main error type for the gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Invalid agent type: {0}")]
    InvalidAgent(String),

    #[error("Prompt too large: {size} characters (limit {limit})")]
    PromptTooLarge { size: usize, limit: usize },

    #[error("Rate limit exceeded for user {0}, try again in a minute")]
    RateLimited(String),

    #[error("Insufficient credits: balance {balance}, at least {required} required")]
    InsufficientCredits { balance: i64, required: i64 },

    #[error("Provider unavailable, try again later: {0}")]
    ProviderUnavailable(String),

    #[error("LLM service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl GatewayError {
    /// Stable machine-readable kind, safe to expose to callers
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidAgent(_) | GatewayError::PromptTooLarge { .. } => "invalid_input",
            GatewayError::RateLimited(_) => "rate_limited",
            GatewayError::InsufficientCredits { .. } => "insufficient_credits",
            GatewayError::ProviderUnavailable(_) => "provider_unavailable",
            GatewayError::ServiceUnavailable => "service_unavailable",
            GatewayError::Config(_) => "config",
            GatewayError::Ledger(_) => "ledger",
        }
    }

    /// Errors the caller caused; these never touch the network or the ledger
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidAgent(_)
                | GatewayError::PromptTooLarge { .. }
                | GatewayError::RateLimited(_)
                | GatewayError::InsufficientCredits { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(GatewayError::InvalidAgent("x".into()).kind(), "invalid_input");
        assert_eq!(
            GatewayError::PromptTooLarge { size: 10, limit: 5 }.kind(),
            "invalid_input"
        );
        assert_eq!(GatewayError::RateLimited("u".into()).kind(), "rate_limited");
        assert_eq!(GatewayError::ServiceUnavailable.kind(), "service_unavailable");
    }

    #[test]
    fn test_provider_errors_are_not_caller_errors() {
        assert!(GatewayError::RateLimited("u".into()).is_caller_error());
        assert!(!GatewayError::ProviderUnavailable("boom".into()).is_caller_error());
        assert_eq!(
            GatewayError::ServiceUnavailable.to_string(),
            "LLM service unavailable"
        );
    }
}
