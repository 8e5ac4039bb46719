// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod logger;
mod tokenizer;

// Public re-exports - the ONLY way to access utils functionality
pub use errors::GatewayError;
pub use logger::init_logger;
pub use tokenizer::{count_chars, count_words, Tokenizer};
