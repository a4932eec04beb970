//! Conversation session tests: history, effective queries and failure
//! handling across turns.

mod common;

use common::mocks::{report_index, FailingEmbedder, MockLLMClient, GROUNDED_ANSWER};
use docqa::memory::{Conversation, ConversationSettings, SessionState};
use docqa::rag::citation::NOT_FOUND;
use docqa::types::AppError;
use docqa::utils::toml_config::RewriteMode;
use rstest::rstest;
use std::sync::Arc;

async fn session(llm: MockLLMClient, settings: ConversationSettings) -> Conversation {
    let (index, embedder) = report_index().await;
    Conversation::new(index, embedder, Arc::new(llm), settings).unwrap()
}

#[tokio::test]
async fn test_history_feeds_next_prompt() {
    let llm = MockLLMClient::scripted(&[GROUNDED_ANSWER, NOT_FOUND]);
    let mut conversation = session(llm.clone(), ConversationSettings::default()).await;

    conversation.ask("What was Q4 2025 revenue?").await.unwrap();
    conversation.ask("And the margin?").await.unwrap();

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("PREVIOUS CONVERSATION:"));
    assert!(prompts[1].contains("PREVIOUS CONVERSATION:\nUser: What was Q4 2025 revenue?"));
    assert!(prompts[1].contains("Assistant: Answer:"));

    let second = &conversation.history()[1];
    assert!(second.effective_query.ends_with("User: And the margin?"));
    assert!(second.effective_query.contains("What was Q4 2025 revenue?"));
}

#[tokio::test]
async fn test_rejected_answer_enters_history_as_refusal() {
    let llm = MockLLMClient::scripted(&[
        "Answer:\nRevenue was huge.\n\nCitations:\n[p2:c5]\n\nEvidence:\n[p2:c5] \"huge revenue\"",
        NOT_FOUND,
    ]);
    let mut conversation = session(llm.clone(), ConversationSettings::default()).await;

    let first = conversation.ask("What was Q4 2025 revenue?").await.unwrap();
    assert!(first.is_refusal());
    assert!(first.outcome.rejection().is_some());

    conversation.ask("Why?").await.unwrap();
    let prompt = &llm.prompts()[1];
    assert!(prompt.contains(&format!("Assistant: {}", NOT_FOUND)));
    assert!(!prompt.contains("Revenue was huge"));
}

#[tokio::test]
async fn test_generation_failure_is_not_recorded() {
    let mut conversation = session(MockLLMClient::failing(), ConversationSettings::default()).await;

    let err = conversation.ask("What was Q4 2025 revenue?").await.unwrap_err();
    assert!(matches!(err, AppError::LLM(_)));
    assert!(err.is_retryable());
    assert!(conversation.history().is_empty());
    assert_eq!(conversation.state(), SessionState::AwaitingQuery);
}

#[tokio::test]
async fn test_embedding_failure_is_not_recorded() {
    let (index, _) = report_index().await;
    let mut conversation = Conversation::new(
        index,
        Arc::new(FailingEmbedder::new()),
        Arc::new(MockLLMClient::new(GROUNDED_ANSWER)),
        ConversationSettings::default(),
    )
    .unwrap();

    let err = conversation.ask("What was Q4 2025 revenue?").await.unwrap_err();
    assert!(matches!(err, AppError::Embedding(_)));
    assert!(conversation.history().is_empty());
    assert_eq!(conversation.state(), SessionState::AwaitingQuery);
}

#[rstest]
#[case::always(RewriteMode::Always, "How much is that in euros today?", true)]
#[case::off(RewriteMode::Off, "And Q3?", false)]
#[case::follow_up_short(RewriteMode::FollowUps, "And Q3?", true)]
#[case::follow_up_pronoun(RewriteMode::FollowUps, "How much is that in euros today?", true)]
#[case::standalone(RewriteMode::FollowUps, "What was the total Q4 2025 revenue reported?", false)]
#[tokio::test]
async fn test_rewrite_modes(
    #[case] rewrite: RewriteMode,
    #[case] utterance: &str,
    #[case] expect_history: bool,
) {
    let settings = ConversationSettings {
        rewrite,
        ..ConversationSettings::default()
    };
    let mut conversation = session(MockLLMClient::new(GROUNDED_ANSWER), settings).await;
    conversation.ask("What was Q4 2025 revenue?").await.unwrap();
    conversation.ask(utterance).await.unwrap();

    let effective = &conversation.history()[1].effective_query;
    if expect_history {
        assert!(effective.starts_with("User: What was Q4 2025 revenue?"));
        assert!(effective.ends_with(utterance));
    } else {
        assert_eq!(effective, utterance);
    }
}

#[tokio::test]
async fn test_first_turn_uses_plain_utterance() {
    let mut conversation =
        session(MockLLMClient::new(NOT_FOUND), ConversationSettings::default()).await;
    let turn = conversation.ask("  What was Q4 2025 revenue?  ").await.unwrap();
    assert_eq!(turn.effective_query, "What was Q4 2025 revenue?");
    assert_eq!(turn.user_query, "What was Q4 2025 revenue?");
}

#[tokio::test]
async fn test_history_is_unbounded_but_context_is_windowed() {
    let settings = ConversationSettings {
        history_turns: 2,
        ..ConversationSettings::default()
    };
    let mut conversation = session(MockLLMClient::new(NOT_FOUND), settings).await;
    for i in 0..6 {
        conversation
            .ask(&format!("Question number {} about revenue?", i))
            .await
            .unwrap();
    }

    assert_eq!(conversation.history().len(), 6);
    let context = conversation.history_context();
    assert!(!context.contains("number 3"));
    assert!(context.contains("number 4"));
    assert!(context.contains("number 5"));
}

#[tokio::test]
async fn test_reset_starts_fresh() {
    let llm = MockLLMClient::new(NOT_FOUND);
    let mut conversation = session(llm.clone(), ConversationSettings::default()).await;
    conversation.ask("What was Q4 2025 revenue?").await.unwrap();
    let session_id = conversation.session_id();

    conversation.reset();
    conversation.ask("What was Q4 2025 revenue?").await.unwrap();

    assert_eq!(conversation.history().len(), 1);
    assert_eq!(conversation.session_id(), session_id);
    assert!(!llm.prompts()[1].contains("PREVIOUS CONVERSATION:"));
}
