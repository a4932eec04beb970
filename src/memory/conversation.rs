//! One question-answering session over one document.

use crate::llm::client::{GroundedRequest, LLMClient};
use crate::memory::{is_follow_up, render_exchange, truncate_to_tokens};
use crate::rag::citation::{review, Outcome};
use crate::rag::embeddings::Embedder;
use crate::rag::index::DocumentIndex;
use crate::rag::prompt::{build_grounded_prompt, SYSTEM_INSTRUCTION};
use crate::rag::retriever::retrieve;
use crate::types::{AppError, Result, RetrievalResult};
use crate::utils::toml_config::{DocqaConfig, RewriteMode};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Where a session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingQuery,
    ProcessingTurn,
}

/// Per-session knobs, usually taken from [`DocqaConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSettings {
    pub top_k: usize,
    pub history_turns: usize,
    pub max_turn_chars: usize,
    pub history_token_budget: usize,
    pub rewrite: RewriteMode,
}

impl ConversationSettings {
    pub fn from_config(config: &DocqaConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            history_turns: config.conversation.history_turns,
            max_turn_chars: config.conversation.max_turn_chars,
            history_token_budget: config.conversation.history_token_budget,
            rewrite: config.conversation.rewrite,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self::from_config(&DocqaConfig::default())
    }
}

/// A completed turn. Refusals are turns too.
#[derive(Debug, Clone)]
pub struct Turn {
    pub user_query: String,
    /// What was actually embedded for retrieval.
    pub effective_query: String,
    pub retrieved: RetrievalResult,
    /// Generator output before validation.
    pub raw_answer: String,
    pub outcome: Outcome,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    /// The text the user was shown.
    pub fn surfaced(&self) -> &str {
        self.outcome.surfaced()
    }

    pub fn is_refusal(&self) -> bool {
        self.outcome.is_refusal()
    }
}

/// Session state: the index it reads, its collaborators and its history.
///
/// `ask` takes `&mut self`, so turns of one session never overlap. Dropping
/// the value ends the session and discards its history.
pub struct Conversation {
    session_id: Uuid,
    state: SessionState,
    index: Arc<DocumentIndex>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LLMClient>,
    settings: ConversationSettings,
    history: Vec<Turn>,
}

impl Conversation {
    pub fn new(
        index: Arc<DocumentIndex>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LLMClient>,
        settings: ConversationSettings,
    ) -> Result<Self> {
        if settings.top_k < 1 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        Ok(Self {
            session_id: Uuid::new_v4(),
            state: SessionState::AwaitingQuery,
            index,
            embedder,
            llm,
            settings,
            history: Vec::new(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    /// Completed turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Forget all turns; the session continues.
    pub fn reset(&mut self) {
        self.history.clear();
        info!(session = %self.session_id, "Conversation history cleared");
    }

    /// Answer one utterance.
    ///
    /// The turn is recorded whether it was answered or refused. Upstream
    /// failures (embedding, generation) return an error and record nothing.
    #[instrument(skip(self, utterance), fields(session = %self.session_id, turn = self.history.len() + 1))]
    pub async fn ask(&mut self, utterance: &str) -> Result<&Turn> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AppError::InvalidInput("question is empty".to_string()));
        }

        self.state = SessionState::ProcessingTurn;
        let result = self.run_turn(utterance).await;
        self.state = SessionState::AwaitingQuery;

        let turn = result?;
        info!(
            retrieved = turn.retrieved.len(),
            refused = turn.is_refusal(),
            "Turn complete"
        );
        self.history.push(turn);
        self.history
            .last()
            .ok_or_else(|| AppError::Internal("turn was not recorded".to_string()))
    }

    async fn run_turn(&self, utterance: &str) -> Result<Turn> {
        let history = self.history_context();
        let effective_query = self.effective_query(utterance, &history);
        debug!(effective_query = %effective_query, "Effective query");

        let retrieved = retrieve(
            &effective_query,
            &self.index,
            self.settings.top_k,
            self.embedder.as_ref(),
        )
        .await?;

        let prompt = build_grounded_prompt(utterance, &retrieved, Some(&history));
        let request = GroundedRequest {
            system: SYSTEM_INSTRUCTION,
            prompt: &prompt,
            query: utterance,
            retrieved: &retrieved,
        };
        let raw_answer = self.llm.generate_grounded(&request).await?;
        let outcome = review(&raw_answer, &retrieved);

        Ok(Turn {
            user_query: utterance.to_string(),
            effective_query,
            retrieved,
            raw_answer,
            outcome,
            asked_at: Utc::now(),
        })
    }

    /// Bounded transcript of recent turns: the last `history_turns` turns,
    /// each side capped at `max_turn_chars`, oldest dropped to fit the
    /// token budget.
    pub fn history_context(&self) -> String {
        let start = self
            .history
            .len()
            .saturating_sub(self.settings.history_turns);
        let exchanges: Vec<String> = self.history[start..]
            .iter()
            .map(|turn| {
                render_exchange(
                    &turn.user_query,
                    turn.surfaced(),
                    self.settings.max_turn_chars,
                )
            })
            .collect();

        truncate_to_tokens(&exchanges, self.settings.history_token_budget).join("\n")
    }

    /// The retrieval query: the utterance, with the bounded transcript
    /// prepended when the rewrite mode calls for it.
    pub fn effective_query(&self, utterance: &str, history: &str) -> String {
        let prepend = match self.settings.rewrite {
            RewriteMode::Off => false,
            RewriteMode::Always => true,
            RewriteMode::FollowUps => is_follow_up(utterance),
        };

        if prepend && !history.is_empty() {
            format!("{}\nUser: {}", history, utterance)
        } else {
            utterance.to_string()
        }
    }
}
