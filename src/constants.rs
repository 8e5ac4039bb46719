/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;
pub const DEFAULT_LMSTUDIO_PORT: u16 = 1234;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_SERVER_BIND: &str = "127.0.0.1:8001";

// Environment
pub const ENV_PREFIX: &str = "NEURAL_BRIDGE_";
pub const APP_NAME: &str = "neural-bridge";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
pub const MODELS_CACHE_TTL_SECS: u64 = 60;
pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 300;

// Retry
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// Default Model Configuration
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";
pub const DEFAULT_CLOUD_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

// Context assembly
pub const CHARS_PER_TOKEN: usize = 4;
pub const DEFAULT_HISTORY_MESSAGES: usize = 10;

// Limits
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 32_000;
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: usize = 30;
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

// Billing
pub const DEFAULT_CREDITS_PER_1K_TOKENS: f64 = 1.0;
pub const DEFAULT_TOKENS_PER_WORD: f64 = 1.0;
pub const DEFAULT_MIN_CREDITS_FOR_CHAT: i64 = 1;
pub const DEFAULT_STARTING_CREDITS: i64 = 100;

// Streaming
pub const DEFAULT_STREAM_BUFFER: usize = 64;
pub const STREAM_DONE_SENTINEL: &str = "[DONE]";
pub const MAX_STREAM_LINE_BYTES: usize = 1024 * 1024;

// Diagnostics
pub const CONNECTION_TEST_PROMPT: &str = "Say 'Hello' in one word.";
