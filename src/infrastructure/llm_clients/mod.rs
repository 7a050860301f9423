pub mod gemini;
pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use async_trait::async_trait;
use gemini::GeminiClient;
use openai::OpenAIClient;

/// Text-generation backend seam.
///
/// `complete` submits one prompt and returns one completion; decoding
/// parameters come from the config (temperature 0 by default, single
/// candidate). Implementations surface failures as `AppError::LLMError` —
/// callers decide whether that becomes response text or a hard error.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(&self, config: &LLMConfig, prompt: &str) -> Result<String>;
}

/// Dispatches to the concrete client for the configured provider.
pub struct RouterClient {
    openai: OpenAIClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            openai: OpenAIClient::new(),
            gemini: GeminiClient::new(),
        }
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn complete(&self, config: &LLMConfig, prompt: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Gemini => self.gemini.complete(config, prompt).await,
            // Local servers (LM Studio, Ollama, vLLM) speak the OpenAI API.
            _ => self.openai.complete(config, prompt).await,
        }
    }
}
