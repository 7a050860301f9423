use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LLMProvider {
    Local,
    OpenAI,
    Gemini,
}

/// Backend configuration shared by the embedding and generation clients.
///
/// The same shape covers both because the original service configured them
/// side by side; which fields matter depends on the provider (`Local` ignores
/// `base_url`/`api_key`, remote providers ignore nothing).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        // Deterministic decoding: the RAG contract requires greedy, single
        // candidate generation.
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            api_key: None,
            max_tokens: Some(150),
            temperature: Some(0.0),
        }
    }
}

impl LLMConfig {
    /// Defaults for the embedding side: a local sentence-embedding model.
    pub fn local_embedding() -> Self {
        Self {
            provider: LLMProvider::Local,
            base_url: String::new(),
            model: "all-minilm-l6-v2".to_string(),
            api_key: None,
            max_tokens: None,
            temperature: None,
        }
    }
}
