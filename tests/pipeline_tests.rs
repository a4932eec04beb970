//! End-to-end tests of the grounded pipeline: retrieval, generation and
//! citation validation over a fixed report.

mod common;

use common::mocks::{
    report_index, MockLLMClient, FABRICATED_ANSWER, GROUNDED_ANSWER, REVENUE_TEXT,
};
use docqa::extract::{Extractor, PlainTextExtractor};
use docqa::llm::ExtractiveClient;
use docqa::memory::{Conversation, ConversationSettings};
use docqa::rag::chunker::TextChunker;
use docqa::rag::citation::{review, validate, Outcome, Verdict, NOT_FOUND};
use docqa::rag::embeddings::HashingEmbedder;
use docqa::rag::index::DocumentIndex;
use docqa::rag::retriever::retrieve;
use docqa::types::{CitationKey, ValidationError};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const REVENUE_QUESTION: &str = "What was Q4 2025 revenue?";

#[tokio::test]
async fn test_revenue_question_retrieves_c42_first() {
    let (index, embedder) = report_index().await;
    let retrieved = retrieve(REVENUE_QUESTION, &index, 5, embedder.as_ref())
        .await
        .unwrap();

    assert_eq!(retrieved.len(), 5);
    let top = &retrieved.iter().next().unwrap().passage;
    assert_eq!(top.citation(), CitationKey { page: 13, chunk_id: 42 });
    assert_eq!(top.text, REVENUE_TEXT);

    let scores: Vec<f32> = retrieved.iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_grounded_answer_is_accepted_unchanged() {
    let (index, embedder) = report_index().await;
    let retrieved = retrieve(REVENUE_QUESTION, &index, 5, embedder.as_ref())
        .await
        .unwrap();

    match validate(GROUNDED_ANSWER, &retrieved).unwrap() {
        Verdict::Grounded(answer) => {
            assert_eq!(answer.text, GROUNDED_ANSWER);
            assert_eq!(answer.citations, vec![CitationKey { page: 13, chunk_id: 42 }]);
        }
        Verdict::Refusal => panic!("grounded answer treated as refusal"),
    }
    assert_eq!(review(GROUNDED_ANSWER, &retrieved).surfaced(), GROUNDED_ANSWER);
}

#[tokio::test]
async fn test_altered_figure_is_downgraded() {
    let (index, embedder) = report_index().await;
    let retrieved = retrieve(REVENUE_QUESTION, &index, 5, embedder.as_ref())
        .await
        .unwrap();

    let outcome = review(FABRICATED_ANSWER, &retrieved);
    assert_eq!(outcome.surfaced(), NOT_FOUND);
    assert!(matches!(
        outcome.rejection(),
        Some(ValidationError::FabricatedEvidence { .. })
    ));
}

#[tokio::test]
async fn test_citation_outside_retrieved_set_is_downgraded() {
    let (index, embedder) = report_index().await;
    let retrieved = retrieve(REVENUE_QUESTION, &index, 1, embedder.as_ref())
        .await
        .unwrap();
    assert_eq!(retrieved.ids(), vec![42]);

    let filler = &index.passages()[3];
    let answer = format!(
        "Answer:\nParking permits exist {cite}.\n\nCitations:\n{cite}\n\nEvidence:\n{cite} \"{quote}\"",
        cite = filler.citation(),
        quote = filler.text
    );
    let outcome = review(&answer, &retrieved);
    assert!(outcome.is_refusal());
    assert!(matches!(
        outcome.rejection(),
        Some(ValidationError::UngroundedCitation { .. })
    ));
}

#[tokio::test]
async fn test_refusal_passes_through() {
    let (index, embedder) = report_index().await;
    let llm = Arc::new(MockLLMClient::new(NOT_FOUND));
    let mut conversation =
        Conversation::new(index, embedder, llm, ConversationSettings::default()).unwrap();

    let turn = conversation
        .ask("Who designed the company logo?")
        .await
        .unwrap();
    assert_eq!(turn.surfaced(), NOT_FOUND);
    assert_eq!(turn.outcome, Outcome::Refused { reason: None });
}

#[tokio::test]
async fn test_turn_prompt_carries_chunks_and_question() {
    let (index, embedder) = report_index().await;
    let llm = MockLLMClient::new(GROUNDED_ANSWER);
    let mut conversation = Conversation::new(
        index,
        embedder,
        Arc::new(llm.clone()),
        ConversationSettings::default(),
    )
    .unwrap();

    let turn = conversation.ask(REVENUE_QUESTION).await.unwrap();
    assert_eq!(turn.surfaced(), GROUNDED_ANSWER);

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("[CHUNK 1] [p13:c42]"));
    assert!(prompt.contains(REVENUE_TEXT));
    assert!(prompt.contains(REVENUE_QUESTION));
    assert!(llm.system_prompts()[0].contains(NOT_FOUND));
}

#[tokio::test]
async fn test_text_file_to_extractive_answer() {
    let mut file = NamedTempFile::with_suffix(".txt").unwrap();
    // Every page is 49 characters, so with its separator it fills one window.
    let mut pages: Vec<String> = (1..13)
        .map(|p| format!("{:<49}", format!("Page {} lists office locations and opening times.", p)))
        .collect();
    pages.push(REVENUE_TEXT.to_string());
    write!(file, "{}", pages.join("\x0C")).unwrap();

    let pages = PlainTextExtractor.extract(file.path()).await.unwrap();
    assert_eq!(pages.len(), 13);

    let chunker = TextChunker::new(50, 0).unwrap();
    let passages = chunker.chunk(&pages).unwrap();
    assert_eq!(passages.len(), 13);
    let embedder = Arc::new(HashingEmbedder::default());
    let index = DocumentIndex::build(passages, embedder.as_ref(), 4)
        .await
        .unwrap();

    let mut conversation = Conversation::new(
        Arc::new(index),
        embedder,
        Arc::new(ExtractiveClient::new()),
        ConversationSettings {
            top_k: 3,
            ..ConversationSettings::default()
        },
    )
    .unwrap();

    let turn = conversation.ask(REVENUE_QUESTION).await.unwrap();
    assert!(!turn.is_refusal(), "refused: {:?}", turn.outcome);
    assert!(turn.surfaced().contains("[p13:c12]"));
    assert!(turn.surfaced().contains("$2.5 billion"));
}
