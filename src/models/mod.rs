// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use types::{
    ChatMessage, ChatRequest, CompletionRequest, CurrentFile, GenerateRequest, MessageRole,
    ModelInfo, ProjectContext, StreamEvent,
};
