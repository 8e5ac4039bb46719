use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A file the caller is currently looking at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFile {
    pub name: String,
    pub content: String,
}

/// Project context supplied by the project collaborator.
///
/// The gateway treats it as opaque text: either a pre-rendered `snippet`,
/// or the structured fields rendered by [`ProjectContext::to_prompt_context`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub current_file: Option<CurrentFile>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl ProjectContext {
    /// Wrap an already rendered context block
    pub fn from_snippet(snippet: impl Into<String>) -> Self {
        Self {
            snippet: Some(snippet.into()),
            ..Self::default()
        }
    }

    /// Get a formatted string of the project context for the model
    pub fn to_prompt_context(&self) -> String {
        let mut parts = Vec::new();

        if let Some(user) = &self.user_name {
            parts.push(format!("User: {}", user));
        }

        if let Some(project) = &self.project_name {
            match &self.language {
                Some(language) => parts.push(format!("Project: {} ({})", project, language)),
                None => parts.push(format!("Project: {}", project)),
            }
        }

        if let Some(file) = &self.current_file {
            parts.push(format!(
                "Current file ({}):\n```\n{}\n```",
                file.name, file.content
            ));
        }

        if let Some(snippet) = &self.snippet {
            parts.push(snippet.clone());
        }

        parts.join("\n")
    }

    /// Combine the context block with the caller's message
    pub fn wrap_message(&self, message: &str) -> String {
        let context = self.to_prompt_context();
        if context.trim().is_empty() {
            message.to_string()
        } else {
            format!("{}\n\nRequest: {}", context, message)
        }
    }
}

/// A model served by the active provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// Size in bytes for local servers, owner for hosted APIs
    pub size_or_owner: Option<String>,
    pub last_modified: Option<String>,
}

/// Provider-neutral completion request handed to a dialect
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_window: usize,
    pub stream: bool,
}

impl CompletionRequest {
    /// The system prompt, if the first message carries one
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the final user message
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Raw text generation, outside of any agent persona
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

fn default_prefer_local() -> bool {
    true
}

/// A chat request from an agent persona. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Agent persona id, e.g. `code` or `review`
    pub agent: String,
    pub message: String,
    #[serde(default)]
    pub project_context: Option<ProjectContext>,
    #[serde(default = "default_prefer_local")]
    pub prefer_local: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Recent conversation, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            message: message.into(),
            project_context: None,
            prefer_local: true,
            model: None,
            temperature: None,
            max_tokens: None,
            history: Vec::new(),
        }
    }

    pub fn prefer_cloud(mut self) -> Self {
        self.prefer_local = false;
        self
    }

    pub fn with_project_context(mut self, context: ProjectContext) -> Self {
        self.project_context = Some(context);
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// One item of a streamed generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A chunk of generated text, in receipt order
    Delta(String),
    /// Explicit end of stream; always the last event
    End,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_context_rendering() {
        let context = ProjectContext {
            user_name: Some("Ada".to_string()),
            project_name: Some("engine".to_string()),
            language: Some("rust".to_string()),
            current_file: Some(CurrentFile {
                name: "main.rs".to_string(),
                content: "fn main() {}".to_string(),
            }),
            snippet: None,
        };

        assert_eq!(
            context.wrap_message("fix it"),
            "User: Ada\nProject: engine (rust)\nCurrent file (main.rs):\n```\nfn main() {}\n```\n\nRequest: fix it"
        );
    }

    #[test]
    fn test_empty_context_leaves_message_alone() {
        assert_eq!(ProjectContext::default().wrap_message("ping"), "ping");
        assert_eq!(
            ProjectContext::from_snippet("Project: demo").wrap_message("ping"),
            "Project: demo\n\nRequest: ping"
        );
    }

    #[test]
    fn test_chat_request_defaults_to_local() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"agent":"code","message":"hi"}"#).unwrap();
        assert!(request.prefer_local);
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_message_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
