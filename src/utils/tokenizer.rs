use crate::constants::CHARS_PER_TOKEN;

/// Approximate token accounting.
///
/// Exact tokenization depends on the model behind the provider, which the
/// gateway does not know. Two cheap proxies are used instead: characters for
/// context budgeting and whitespace-delimited words for usage metering.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    tokens_per_word: f64,
}

impl Tokenizer {
    /// Create a tokenizer with the given word-to-token conversion factor
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }

    /// Estimate the token count of a text for metering
    pub fn estimate_tokens(&self, text: &str) -> u64 {
        let words = count_words(text) as f64;
        (words * self.tokens_per_word).ceil() as u64
    }

    /// Convert a context window in tokens to a character budget
    pub fn char_budget(context_window: usize) -> usize {
        context_window.saturating_mul(CHARS_PER_TOKEN)
    }
}

/// Count whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count characters (not bytes)
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}
