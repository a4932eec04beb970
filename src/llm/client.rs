//! LLM client abstraction and provider selection
//!
//! Providers:
//! - **Extractive**: offline, quotes the top retrieved passage (default)
//! - **Ollama**: local inference server (`ollama` feature)
//! - **OpenAI**: OpenAI and compatible APIs (`openai` feature)

use crate::types::{AppError, Result, RetrievalResult};
use crate::utils::toml_config::{LlmConfig, LlmProvider};
use async_trait::async_trait;

/// Everything a generator sees for one grounded turn.
#[derive(Debug, Clone, Copy)]
pub struct GroundedRequest<'a> {
    /// Grounding rules and output skeleton.
    pub system: &'a str,
    /// Rendered user prompt (chunks, history, question).
    pub prompt: &'a str,
    /// The user's question as typed.
    pub query: &'a str,
    /// Passages retrieved for this turn.
    pub retrieved: &'a RetrievalResult,
}

/// Generic LLM client trait for provider abstraction
///
/// Output is untrusted: callers validate it before showing it.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Answer a grounded request. Defaults to a system + user completion.
    async fn generate_grounded(&self, request: &GroundedRequest<'_>) -> Result<String> {
        self.generate_with_system(request.system, request.prompt)
            .await
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    /// Retrieval-only answers, no model
    Extractive,

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    ///     temperature: 0.1,
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        temperature: f32,
    },

    /// OpenAI API provider (including compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
    },
}

impl Provider {
    /// Resolve the configured provider, reading API keys from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        match config.provider {
            LlmProvider::Extractive => Ok(Provider::Extractive),
            LlmProvider::Ollama => Ok(Provider::Ollama {
                base_url: config.resolved_base_url(),
                model: config.model.clone(),
                temperature: config.temperature,
            }),
            LlmProvider::OpenAI => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    AppError::Config(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: config.resolved_base_url(),
                    model: config.model.clone(),
                    temperature: config.temperature,
                })
            }
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the provider's Cargo feature is
    /// not enabled.
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Extractive => Ok(Box::new(super::extractive::ExtractiveClient::new())),

            #[cfg(feature = "ollama")]
            Provider::Ollama {
                base_url,
                model,
                temperature,
            } => Ok(Box::new(super::ollama::OllamaClient::new(
                base_url,
                model.clone(),
                *temperature,
            ))),
            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { .. } => Err(AppError::Config(
                "LLM provider 'ollama' requires the `ollama` feature".to_string(),
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *temperature,
            ))),
            #[cfg(not(feature = "openai"))]
            Provider::OpenAI { .. } => Err(AppError::Config(
                "LLM provider 'openai' requires the `openai` feature".to_string(),
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Extractive => "Extractive",
            Provider::Ollama { .. } => "Ollama",
            Provider::OpenAI { .. } => "OpenAI",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        assert_eq!(Provider::Extractive.name(), "Extractive");
        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "".to_string(),
            temperature: 0.1,
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_default_config_is_extractive() {
        let provider = Provider::from_config(&LlmConfig::default()).unwrap();
        assert_eq!(provider, Provider::Extractive);
        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "extractive");
    }

    #[test]
    fn test_ollama_carries_configured_temperature() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            model: "llama3.2".to_string(),
            temperature: 0.3,
            ..LlmConfig::default()
        };
        match Provider::from_config(&config).unwrap() {
            Provider::Ollama {
                model, temperature, ..
            } => {
                assert_eq!(model, "llama3.2");
                assert!((temperature - 0.3).abs() < f32::EPSILON);
            }
            other => panic!("expected Ollama, got {:?}", other),
        }

        let default = LlmConfig {
            provider: LlmProvider::Ollama,
            ..LlmConfig::default()
        };
        assert!(matches!(
            Provider::from_config(&default).unwrap(),
            Provider::Ollama { temperature, .. } if (temperature - 0.1).abs() < f32::EPSILON
        ));
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAI,
            api_key_env: "DOCQA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            Provider::from_config(&config),
            Err(AppError::Config(_))
        ));
    }
}
