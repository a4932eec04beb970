use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

const DEFAULT_PORT: u16 = 11434;

/// Split `http://host:port` into the host (scheme kept) and port.
pub fn parse_host_port(base_url: &str) -> (String, u16) {
    let url = base_url.trim_end_matches('/');
    if let Some(colon) = url.rfind(':') {
        if let Ok(port) = url[colon + 1..].parse::<u16>() {
            return (url[..colon].to_string(), port);
        }
    }
    (url.to_string(), DEFAULT_PORT)
}

/// Ollama handle for a base URL; shared by chat and embeddings.
pub fn connect(base_url: &str) -> Ollama {
    let (host, port) = parse_host_port(base_url);
    Ollama::new(host, port)
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String, temperature: f32) -> Self {
        Self {
            client: connect(base_url),
            model,
            temperature,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatMessageRequest {
        ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(self.temperature))
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = self.request(messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
