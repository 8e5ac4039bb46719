use serde::Deserialize;
use serde_json::{json, Value};

use super::kind::ProviderKind;
use crate::constants::STREAM_DONE_SENTINEL;
use crate::models::{CompletionRequest, ModelInfo};
use crate::utils::GatewayError;

/// Which completion endpoint a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Multi-message chat
    Chat,
    /// Single prompt generation
    Generate,
}

/// Flavours of the OpenAI-compatible wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiVariant {
    LmStudio,
    OpenAi,
}

/// Wire dialect of a provider: four endpoints and the payload transforms.
///
/// Pure translation only. Nothing in here touches the network, which keeps
/// every dialect exhaustively matchable and testable on plain JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Ollama,
    OpenAiCompatible(OpenAiVariant),
}

/// Result of parsing one line of a streamed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Generated text
    Delta(String),
    /// Control or empty frame carrying no content
    Skip,
    /// The provider signalled end of stream
    Done,
    /// The provider reported an error inside the stream
    Error(String),
}

impl From<ProviderKind> for Dialect {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Ollama => Dialect::Ollama,
            ProviderKind::LmStudio => Dialect::OpenAiCompatible(OpenAiVariant::LmStudio),
            ProviderKind::OpenAi => Dialect::OpenAiCompatible(OpenAiVariant::OpenAi),
        }
    }
}

impl Dialect {
    pub fn chat_url(&self, base_url: &str) -> String {
        match self {
            Dialect::Ollama => join(base_url, "/api/chat"),
            Dialect::OpenAiCompatible(_) => join(base_url, "/v1/chat/completions"),
        }
    }

    pub fn generate_url(&self, base_url: &str) -> String {
        match self {
            Dialect::Ollama => join(base_url, "/api/generate"),
            // Generation is a one-message chat on OpenAI-style servers
            Dialect::OpenAiCompatible(_) => join(base_url, "/v1/chat/completions"),
        }
    }

    pub fn models_url(&self, base_url: &str) -> String {
        match self {
            Dialect::Ollama => join(base_url, "/api/tags"),
            Dialect::OpenAiCompatible(_) => join(base_url, "/v1/models"),
        }
    }

    pub fn health_url(&self, base_url: &str) -> String {
        match self {
            Dialect::Ollama => join(base_url, "/api/version"),
            Dialect::OpenAiCompatible(_) => join(base_url, "/v1/models"),
        }
    }

    pub fn url(&self, base_url: &str, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Chat => self.chat_url(base_url),
            Endpoint::Generate => self.generate_url(base_url),
        }
    }

    /// Hosted APIs refuse unauthenticated calls
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Dialect::OpenAiCompatible(OpenAiVariant::OpenAi))
    }

    /// Translate a neutral request into the wire payload
    pub fn build_request(&self, endpoint: Endpoint, request: &CompletionRequest) -> Value {
        match (self, endpoint) {
            (Dialect::Ollama, Endpoint::Chat) => json!({
                "model": request.model,
                "messages": request.messages,
                "stream": request.stream,
                "options": ollama_options(request),
            }),
            (Dialect::Ollama, Endpoint::Generate) => {
                let mut body = json!({
                    "model": request.model,
                    "prompt": request.last_user_message(),
                    "stream": request.stream,
                    "options": ollama_options(request),
                });
                if let Some(system) = request.system_prompt() {
                    body["system"] = json!(system);
                }
                body
            }
            (Dialect::OpenAiCompatible(_), _) => json!({
                "model": request.model,
                "messages": request.messages,
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
                "stream": request.stream,
            }),
        }
    }

    /// Extract the generated text from a unary response body
    pub fn parse_response(&self, endpoint: Endpoint, body: &Value) -> Result<String, GatewayError> {
        match self {
            Dialect::Ollama => {
                let reply: OllamaReply = serde_json::from_value(body.clone()).map_err(malformed)?;
                if let Some(error) = reply.error {
                    return Err(GatewayError::ProviderUnavailable(error));
                }
                let message = reply.message.and_then(|m| m.content);
                let content = match endpoint {
                    Endpoint::Chat => message.or(reply.response),
                    Endpoint::Generate => reply.response.or(message),
                };
                content.ok_or_else(|| malformed("no content in Ollama reply"))
            }
            Dialect::OpenAiCompatible(_) => {
                let reply: ChatCompletion = serde_json::from_value(body.clone()).map_err(malformed)?;
                if let Some(error) = reply.error {
                    return Err(GatewayError::ProviderUnavailable(error.message));
                }
                reply
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message)
                    .and_then(|m| m.content)
                    .ok_or_else(|| malformed("no choices in completion reply"))
            }
        }
    }

    /// Parse one line of a streamed response.
    ///
    /// `Ok(Skip)` is a frame with nothing to deliver, `Ok(Done)` ends the
    /// stream, and `Err` means the line was malformed.
    pub fn parse_stream_line(&self, endpoint: Endpoint, line: &str) -> Result<StreamFrame, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(StreamFrame::Skip);
        }

        match self {
            Dialect::Ollama => {
                let reply: OllamaReply = serde_json::from_str(line)?;
                if let Some(error) = reply.error {
                    return Ok(StreamFrame::Error(error));
                }
                let message = reply.message.and_then(|m| m.content);
                let text = match endpoint {
                    Endpoint::Chat => message.or(reply.response),
                    Endpoint::Generate => reply.response.or(message),
                }
                .unwrap_or_default();

                Ok(match (text.is_empty(), reply.done) {
                    (true, true) => StreamFrame::Done,
                    (true, false) => StreamFrame::Skip,
                    (false, _) => StreamFrame::Delta(text),
                })
            }
            Dialect::OpenAiCompatible(_) => {
                // SSE comments, event names, ids and retry hints carry no content
                let Some(data) = line.strip_prefix("data:") else {
                    return Ok(StreamFrame::Skip);
                };
                let data = data.trim_start();
                if data == STREAM_DONE_SENTINEL {
                    return Ok(StreamFrame::Done);
                }

                let chunk: ChatCompletion = serde_json::from_str(data)?;
                if let Some(error) = chunk.error {
                    return Ok(StreamFrame::Error(error.message));
                }
                let text = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta)
                    .and_then(|d| d.content)
                    .unwrap_or_default();

                Ok(if text.is_empty() {
                    StreamFrame::Skip
                } else {
                    StreamFrame::Delta(text)
                })
            }
        }
    }

    /// Parse the model listing endpoint
    pub fn parse_models(&self, body: &Value) -> Result<Vec<ModelInfo>, serde_json::Error> {
        match self {
            Dialect::Ollama => {
                let tags: OllamaTags = serde_json::from_value(body.clone())?;
                Ok(tags
                    .models
                    .into_iter()
                    .map(|m| ModelInfo {
                        name: m.name,
                        size_or_owner: m.size.map(|s| s.to_string()),
                        last_modified: m.modified_at,
                    })
                    .collect())
            }
            Dialect::OpenAiCompatible(_) => {
                let models: OpenAiModels = serde_json::from_value(body.clone())?;
                Ok(models
                    .data
                    .into_iter()
                    .map(|m| ModelInfo {
                        name: m.id,
                        size_or_owner: m.owned_by,
                        last_modified: m
                            .created
                            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                            .map(|dt| dt.to_rfc3339()),
                    })
                    .collect())
            }
        }
    }
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn ollama_options(request: &CompletionRequest) -> Value {
    json!({
        "temperature": request.temperature,
        "num_predict": request.max_tokens,
        "num_ctx": request.context_window,
    })
}

fn malformed(cause: impl std::fmt::Display) -> GatewayError {
    GatewayError::ProviderUnavailable(format!("malformed provider response: {}", cause))
}

// Wire structures

#[derive(Debug, Deserialize)]
struct OllamaReply {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    delta: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModels {
    #[serde(default)]
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
    #[serde(default)]
    created: Option<i64>,
}
