use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::constants::{DEFAULT_LMSTUDIO_PORT, DEFAULT_OLLAMA_PORT};

/// The provider families the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server (`/api/chat`, `/api/generate`, `/api/tags`)
    Ollama,
    /// Local LM Studio server, OpenAI-compatible
    LmStudio,
    /// Hosted OpenAI API
    OpenAi,
}

impl ProviderKind {
    /// Registration order; the first entry is the fail-closed default
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Ollama, ProviderKind::LmStudio, ProviderKind::OpenAi];

    /// Lenient lookup used at runtime. Unknown names fall back to the first
    /// registered dialect; `Config::validate` rejects them at startup.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown provider '{}', defaulting to {}", name, Self::ALL[0]);
            Self::ALL[0]
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Whether inference runs on infrastructure we operate
    pub fn is_local(&self) -> bool {
        !matches!(self, ProviderKind::OpenAi)
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ProviderKind::Ollama => DEFAULT_OLLAMA_PORT,
            ProviderKind::LmStudio => DEFAULT_LMSTUDIO_PORT,
            ProviderKind::OpenAi => 443,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(ProviderKind::LmStudio),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!(
                "unknown provider '{}', expected one of: ollama, lmstudio, openai",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_providers() {
        assert_eq!("Ollama".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert_eq!("lm-studio".parse::<ProviderKind>(), Ok(ProviderKind::LmStudio));
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("bard".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_unknown_provider_defaults_to_first_registered() {
        assert_eq!(ProviderKind::from_name("mystery"), ProviderKind::Ollama);
    }

    #[test]
    fn test_locality() {
        assert!(ProviderKind::Ollama.is_local());
        assert!(ProviderKind::LmStudio.is_local());
        assert!(!ProviderKind::OpenAi.is_local());
    }
}
