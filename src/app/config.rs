use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::provider::ProviderKind;
use crate::utils::GatewayError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Primary provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Cloud provider used when a local dispatch fails
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Admission limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Credit metering policy
    #[serde(default)]
    pub billing: BillingConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Primary provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider dialect (ollama, lmstudio, openai)
    pub provider: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Overrides scheme/host/port when set
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub default_model: String,
    pub timeout_secs: u64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Context window in tokens
    pub context_window: usize,
    pub temperature: f32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub models_cache_ttl_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_OLLAMA_PORT,
            base_url: None,
            api_key: None,
            default_model: DEFAULT_LOCAL_MODEL.to_string(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            context_window: DEFAULT_CONTEXT_WINDOW,
            temperature: DEFAULT_TEMPERATURE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            models_cache_ttl_secs: MODELS_CACHE_TTL_SECS,
        }
    }
}

impl LlmConfig {
    pub fn kind(&self) -> ProviderKind {
        ProviderKind::from_name(&self.provider)
    }

    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}://{}:{}", self.scheme, self.host, self.port),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn models_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.models_cache_ttl_secs)
    }
}

/// Cloud fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_CLOUD_MODEL.to_string(),
        }
    }
}

impl FallbackConfig {
    pub fn kind(&self) -> ProviderKind {
        ProviderKind::from_name(&self.provider)
    }

    /// Enabled and holding credentials
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_deref()
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Admission limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum raw prompt size in characters
    pub max_prompt_chars: usize,
    pub max_requests_per_minute: usize,
    /// History entries considered before truncation
    pub history_messages: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            history_messages: DEFAULT_HISTORY_MESSAGES,
        }
    }
}

/// Credit metering policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Charge for local inference too
    pub local_billable: bool,
    pub credits_per_1k_tokens: f64,
    /// Word-to-token conversion used for usage estimates
    pub tokens_per_word: f64,
    pub min_credits_for_chat: i64,
    /// Balance for users first seen by the in-memory ledger
    pub starting_credits: i64,
    /// Append usage records as JSON lines to this file
    pub usage_log: Option<PathBuf>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            local_billable: false,
            credits_per_1k_tokens: DEFAULT_CREDITS_PER_1K_TOKENS,
            tokens_per_word: DEFAULT_TOKENS_PER_WORD,
            min_credits_for_chat: DEFAULT_MIN_CREDITS_FOR_CHAT,
            starting_credits: DEFAULT_STARTING_CREDITS,
            usage_log: None,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Chunks buffered per streaming response
    pub stream_buffer: usize,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_SERVER_BIND.to_string(),
            stream_buffer: DEFAULT_STREAM_BUFFER,
            sweep_interval_secs: RATE_LIMIT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Reject configurations the runtime would otherwise paper over
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.llm
            .provider
            .parse::<ProviderKind>()
            .map_err(|e| GatewayError::Config(format!("llm.provider: {}", e)))?;
        if self.fallback.enabled {
            self.fallback
                .provider
                .parse::<ProviderKind>()
                .map_err(|e| GatewayError::Config(format!("fallback.provider: {}", e)))?;
        }
        if self.llm.retry_attempts == 0 {
            return Err(GatewayError::Config("llm.retry_attempts must be at least 1".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(GatewayError::Config("llm.timeout_secs must be positive".into()));
        }
        if self.llm.context_window == 0 {
            return Err(GatewayError::Config("llm.context_window must be positive".into()));
        }
        if self.limits.max_requests_per_minute == 0 {
            return Err(GatewayError::Config("limits.max_requests_per_minute must be positive".into()));
        }
        if self.billing.credits_per_1k_tokens < 0.0 || self.billing.tokens_per_word < 0.0 {
            return Err(GatewayError::Config("billing rates must not be negative".into()));
        }
        if self.server.stream_buffer == 0 {
            return Err(GatewayError::Config("server.stream_buffer must be positive".into()));
        }
        Ok(())
    }
}

/// Build the layered figment: defaults, global file, project file, explicit file, env
pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(global_config) = global_config_path() {
        if global_config.exists() {
            figment = figment.merge(Toml::file(&global_config));
        }
    }

    let local_config = PathBuf::from(format!(".{}/config.toml", APP_NAME));
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    // NEURAL_BRIDGE_LLM__PORT=11434 -> llm.port
    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

/// Load configuration from multiple sources
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config: Config = figment(explicit)?
        .extract()
        .context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_NAME);
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()?.join("config.toml"),
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(path)
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<Option<PathBuf>> {
    let config_file = get_config_dir()?.join("config.toml");

    if config_file.exists() {
        return Ok(None);
    }

    save_config(&Config::default(), Some(config_file)).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.base_url(), "http://localhost:11434");
        assert_eq!(config.limits.max_requests_per_minute, 30);
        assert!(!config.fallback.is_usable());
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gateway.toml",
                r#"
                [llm]
                provider = "lmstudio"
                port = 1234
                default_model = "qwen2.5-7b"

                [billing]
                local_billable = true
                "#,
            )?;
            jail.set_env("NEURAL_BRIDGE_LLM__PORT", "4321");
            jail.set_env("NEURAL_BRIDGE_LIMITS__MAX_REQUESTS_PER_MINUTE", "5");

            let config: Config = figment(Some(Path::new("gateway.toml")))
                .map_err(|e| e.to_string())?
                .extract()?;

            assert_eq!(config.llm.kind(), ProviderKind::LmStudio);
            assert_eq!(config.llm.port, 4321);
            assert_eq!(config.llm.default_model, "qwen2.5-7b");
            assert_eq!(config.limits.max_requests_per_minute, 5);
            assert!(config.billing.local_billable);
            // untouched sections keep their defaults
            assert_eq!(config.server, ServerConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_unknown_provider_fails_validation() {
        let mut config = Config::default();
        config.llm.provider = "mystery".to_string();
        assert_eq!(config.validate().unwrap_err().kind(), "config");
        // the runtime lookup still fails closed to the first dialect
        assert_eq!(config.llm.kind(), ProviderKind::Ollama);
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            GatewayError::Config("llm.timeout_secs must be positive".to_string())
        );
    }

    #[test]
    fn test_base_url_override() {
        let llm = LlmConfig {
            base_url: Some("https://llm.internal/".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(llm.base_url(), "https://llm.internal");
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = save_config(&Config::default(), Some(dir.path().join("config.toml"))).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
