use crate::constants::DEFAULT_HISTORY_MESSAGES;
use crate::models::ChatMessage;
use crate::utils::{count_chars, Tokenizer};

/// Builds the bounded message list sent to a provider.
///
/// The system prompt and the current user message are always kept intact.
/// History fills whatever character budget is left, newest first, and is
/// emitted in chronological order.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    char_budget: usize,
    history_limit: usize,
}

impl ContextAssembler {
    pub fn new(context_window: usize, history_limit: usize) -> Self {
        Self {
            char_budget: Tokenizer::char_budget(context_window),
            history_limit,
        }
    }

    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    pub fn assemble(&self, system: Option<&str>, history: &[ChatMessage], user_message: &str) -> Vec<ChatMessage> {
        let system = system.filter(|s| !s.trim().is_empty());

        let fixed = system.map(count_chars).unwrap_or(0) + count_chars(user_message);
        let mut remaining = self.char_budget.saturating_sub(fixed);

        let recent_start = history.len().saturating_sub(self.history_limit);
        let mut kept: Vec<&ChatMessage> = Vec::new();
        for message in history[recent_start..].iter().rev() {
            let size = count_chars(&message.content);
            if size > remaining {
                break;
            }
            remaining -= size;
            kept.push(message);
        }
        kept.reverse();

        let mut messages = Vec::with_capacity(kept.len() + 2);
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(kept.into_iter().cloned());
        messages.push(ChatMessage::user(user_message));
        messages
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CONTEXT_WINDOW, DEFAULT_HISTORY_MESSAGES)
    }
}

/// Total characters of a message list, the unit the budget is expressed in
pub fn total_chars(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| count_chars(&m.content)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;
    use pretty_assertions::assert_eq;

    fn turn(i: usize, size: usize) -> ChatMessage {
        let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
        ChatMessage::new(role, format!("{}{}", i, "x".repeat(size.saturating_sub(1))))
    }

    #[test]
    fn test_keeps_system_and_current_message() {
        let assembler = ContextAssembler::new(100, 10);
        let messages = assembler.assemble(Some("be brief"), &[], "ping");
        assert_eq!(messages, vec![ChatMessage::system("be brief"), ChatMessage::user("ping")]);
    }

    #[test]
    fn test_empty_system_prompt_is_dropped() {
        let messages = ContextAssembler::default().assemble(Some(""), &[], "ping");
        assert_eq!(messages, vec![ChatMessage::user("ping")]);
    }

    #[test]
    fn test_history_is_truncated_oldest_first_and_stays_chronological() {
        // budget 40 chars; system 5 + user 5 leaves 30
        let assembler = ContextAssembler::new(10, 10);
        let history: Vec<ChatMessage> = (0..5).map(|i| turn(i, 10)).collect();

        let messages = assembler.assemble(Some("sys00"), &history, "req00");

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(&messages[1..4], &history[2..5]);
        assert_eq!(messages[4], ChatMessage::user("req00"));
        assert!(total_chars(&messages) <= assembler.char_budget());
    }

    #[test]
    fn test_stops_at_first_message_that_does_not_fit() {
        let assembler = ContextAssembler::new(10, 10);
        // newest fits, the one before is too large, the oldest would fit but is unreachable
        let history = vec![turn(0, 2), turn(1, 35), turn(2, 10)];

        let messages = assembler.assemble(None, &history, "hi");
        assert_eq!(messages, vec![history[2].clone(), ChatMessage::user("hi")]);
    }

    #[test]
    fn test_only_recent_history_is_considered() {
        let assembler = ContextAssembler::new(100_000, 10);
        let history: Vec<ChatMessage> = (0..25).map(|i| turn(i, 3)).collect();

        let messages = assembler.assemble(None, &history, "now");
        assert_eq!(messages.len(), 11);
        assert_eq!(messages[0], history[15]);
    }

    #[test]
    fn test_oversized_request_is_emitted_untruncated() {
        let assembler = ContextAssembler::new(2, 10); // 8 chars
        let long = "y".repeat(50);
        let messages = assembler.assemble(Some("system prompt"), &[turn(0, 1)], &long);

        assert_eq!(messages, vec![ChatMessage::system("system prompt"), ChatMessage::user(long)]);
    }

    #[test]
    fn test_output_never_exceeds_budget_when_request_fits() {
        for window in [5usize, 16, 64, 256] {
            let assembler = ContextAssembler::new(window, 10);
            let history: Vec<ChatMessage> = (0..12).map(|i| turn(i, 7 + i * 3)).collect();
            let messages = assembler.assemble(Some("sys"), &history, "question");
            assert!(total_chars(&messages) <= assembler.char_budget().max(11));
        }
    }
}
