//! TOML-based configuration for docqa
//!
//! Settings are read from `docqa.toml`. Every field has a default, so a
//! missing file or a partial file is fine; command-line flags override
//! whatever the file says.
//!
//! ```toml
//! [chunking]
//! chunk_size = 2000
//! chunk_overlap = 400
//!
//! [retrieval]
//! top_k = 5
//!
//! [llm]
//! provider = "ollama"
//! model = "llama3.2"
//! ```

use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "docqa.toml";

/// Root configuration structure loaded from docqa.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocqaConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Chunking =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_overlap() -> usize {
    400
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

// ============= Retrieval =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

// ============= Conversation =============

/// When prior turns are prepended to the retrieval query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteMode {
    /// Whenever there is history
    #[default]
    Always,
    /// Only for short or pronoun-bearing utterances
    FollowUps,
    /// Never; the utterance is the query
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Prior turns considered for the query and the prompt
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Cap on each question or answer, in characters
    #[serde(default = "default_max_turn_chars")]
    pub max_turn_chars: usize,

    /// Estimated-token budget for all history text
    #[serde(default = "default_history_token_budget")]
    pub history_token_budget: usize,

    #[serde(default)]
    pub rewrite: RewriteMode,
}

fn default_history_turns() -> usize {
    3
}

fn default_max_turn_chars() -> usize {
    1000
}

fn default_history_token_budget() -> usize {
    1500
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            max_turn_chars: default_max_turn_chars(),
            history_token_budget: default_history_token_budget(),
            rewrite: RewriteMode::default(),
        }
    }
}

// ============= Embedding =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing
    #[default]
    Hashing,
    Ollama,
    Fastembed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model name for the `ollama` and `fastembed` providers
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Embedding calls in flight while building an index
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_concurrency() -> usize {
    8
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            concurrency: default_concurrency(),
            base_url: default_ollama_url(),
        }
    }
}

// ============= LLM =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Retrieval-only answers, no model needed
    #[default]
    Extractive,
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Provider endpoint; defaults depend on the provider
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key (OpenAI)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

impl LlmConfig {
    /// Configured endpoint, or the provider's usual one.
    pub fn resolved_base_url(&self) -> String {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.clone(),
            (None, LlmProvider::OpenAI) => "https://api.openai.com/v1".to_string(),
            (None, _) => default_ollama_url(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
        }
    }
}

// ============= Cache & Logging =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/index")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl DocqaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DocqaConfig = toml::from_str(&content)?;
        config.validate()?;

        debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, else `docqa.toml` if present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Validate parameters and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.provider == LlmProvider::OpenAI {
            std::env::var(&self.llm.api_key_env)
                .map_err(|_| ConfigError::MissingEnvVar(self.llm.api_key_env.clone()))?;
        }

        Ok(())
    }
}
