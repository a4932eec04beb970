//! Conversation memory.
//!
//! This module provides:
//! - The per-session [`Conversation`] and its turn history
//! - Helpers for bounding how much history reaches prompts and queries
//!
//! History lives only as long as its `Conversation`; nothing is persisted.

pub mod conversation;

pub use conversation::{Conversation, ConversationSettings, SessionState, Turn};

/// Pronouns that usually point back at an earlier turn.
const FOLLOW_UP_PRONOUNS: &[&str] = &[
    "it", "they", "them", "this", "that", "these", "those", "he", "she",
];

/// Utterances shorter than this many words are treated as follow-ups.
const FOLLOW_UP_MAX_WORDS: usize = 5;

/// Estimates token count for a piece of text (rough approximation).
///
/// Uses a simple heuristic of ~4 bytes per token for English text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Cut `text` to at most `max_chars` characters.
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Render one prior exchange for prompts and queries.
pub fn render_exchange(question: &str, answer: &str, max_chars: usize) -> String {
    format!(
        "User: {}\nAssistant: {}",
        cap_chars(question.trim(), max_chars).trim_end(),
        cap_chars(answer.trim(), max_chars).trim_end()
    )
}

/// Keeps the most recent blocks that fit within a token budget.
///
/// Walks backwards from the newest block and stops at the first one that
/// would exceed the budget, so the oldest blocks are dropped first.
pub fn truncate_to_tokens(blocks: &[String], token_budget: usize) -> Vec<String> {
    let mut result = Vec::new();
    let mut total_tokens = 0;

    for block in blocks.iter().rev() {
        let block_tokens = estimate_tokens(block);
        if total_tokens + block_tokens > token_budget {
            break;
        }
        result.push(block.clone());
        total_tokens += block_tokens;
    }

    result.reverse();
    result
}

/// Whether an utterance looks like it depends on earlier turns.
pub fn is_follow_up(utterance: &str) -> bool {
    let words: Vec<String> = utterance
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    words.len() < FOLLOW_UP_MAX_WORDS
        || words
            .iter()
            .any(|w| FOLLOW_UP_PRONOUNS.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_cap_chars_respects_char_boundaries() {
        assert_eq!(cap_chars("héllo", 2), "hé");
        assert_eq!(cap_chars("short", 50), "short");
        assert_eq!(cap_chars("anything", 0), "");
    }

    #[test]
    fn test_render_exchange_caps_each_side() {
        let rendered = render_exchange("What was revenue?", "Revenue was $2.5 billion.", 7);
        assert_eq!(rendered, "User: What wa\nAssistant: Revenue");
    }

    #[test]
    fn test_truncate_to_tokens_drops_oldest() {
        let blocks = vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)];
        // 10 tokens each; a budget of 25 keeps the newest two.
        let kept = truncate_to_tokens(&blocks, 25);
        assert_eq!(kept, vec!["b".repeat(40), "c".repeat(40)]);
        assert!(truncate_to_tokens(&blocks, 5).is_empty());
    }

    #[test]
    fn test_is_follow_up() {
        assert!(is_follow_up("And Q3?"));
        assert!(is_follow_up("How did it change compared with the prior year?"));
        assert!(is_follow_up("Why did THEY cut the dividend in 2024?"));
        assert!(!is_follow_up("What was the total Q4 2025 revenue reported?"));
    }
}
