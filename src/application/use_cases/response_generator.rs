//! Retrieval-augmented response generation.
//!
//! Retrieves the top contexts for a query, folds them into a fixed
//! instruction prompt and invokes the generation backend once with
//! deterministic decoding. Every failure mode on this path degrades to a
//! textual message; nothing here returns an error to the dispatcher.

use crate::application::context::ServiceContext;
use crate::application::use_cases::semantic_retriever::{
    RetrievedContext, SemanticRetriever, DEFAULT_TOP_K,
};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use tracing::warn;

pub const NO_CONTEXT_MESSAGE: &str =
    "Sorry, I couldn't find relevant biological context for that query.";
pub const EMPTY_GENERATION_MESSAGE: &str =
    "No specific answer generated from the provided context.";

pub struct ResponseGenerator<'a> {
    retriever: SemanticRetriever<'a>,
    llm_client: &'a dyn LLMClient,
    llm_config: &'a LLMConfig,
}

impl<'a> ResponseGenerator<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self {
            retriever: SemanticRetriever::new(ctx),
            llm_client: ctx.llm_client.as_ref(),
            llm_config: &ctx.config.llm,
        }
    }

    pub async fn generate(&self, query: &str) -> String {
        let contexts = self.retriever.search(query, DEFAULT_TOP_K).await;
        if contexts.is_empty() {
            return NO_CONTEXT_MESSAGE.to_string();
        }

        let prompt = build_instruction_prompt(&aggregate_contexts(&contexts), query);

        match self.llm_client.complete(self.llm_config, &prompt).await {
            Ok(raw) => {
                let response = strip_prompt_echo(&prompt, &raw);
                if response.is_empty() {
                    EMPTY_GENERATION_MESSAGE.to_string()
                } else {
                    response
                }
            }
            Err(e) => {
                warn!(error = %e, "Generation backend failed");
                format!("Error during text generation: {}", e)
            }
        }
    }
}

/// Concatenate retrieved contexts with the fixed per-record template.
fn aggregate_contexts(contexts: &[RetrievedContext]) -> String {
    contexts
        .iter()
        .map(|c| format!("|Protein: {}, Context: {}", c.entry_name, c.context))
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_instruction_prompt(aggregated_context: &str, query: &str) -> String {
    format!(
        "Based ONLY on this context: '{}'. Answer the user's question clearly, listing the relevant proteins: {}",
        aggregated_context, query
    )
}

/// Completion-style backends echo the prompt ahead of the answer; remove it
/// from the front only, so answers quoting the prompt survive intact.
fn strip_prompt_echo(prompt: &str, raw: &str) -> String {
    raw.strip_prefix(prompt).unwrap_or(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::ServiceContext;
    use crate::domain::error::Result;
    use crate::domain::protein::ProteinTable;
    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::embeddings::EmbeddingService;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct PanicClient;

    #[async_trait]
    impl LLMClient for PanicClient {
        async fn complete(&self, _config: &LLMConfig, _prompt: &str) -> Result<String> {
            panic!("generation backend must not be invoked without contexts");
        }
    }

    fn sample_context(name: &str, text: &str) -> RetrievedContext {
        RetrievedContext {
            entry_name: name.to_string(),
            similarity_score: "0.9000".to_string(),
            context: text.to_string(),
        }
    }

    #[test]
    fn test_aggregate_contexts_template() {
        let aggregated = aggregate_contexts(&[
            sample_context("THRB_HUMAN", "Protein: Prothrombin."),
            sample_context("ANT3_HUMAN", "Protein: Antithrombin-III."),
        ]);
        assert_eq!(
            aggregated,
            "|Protein: THRB_HUMAN, Context: Protein: Prothrombin. \
             |Protein: ANT3_HUMAN, Context: Protein: Antithrombin-III."
        );
    }

    #[test]
    fn test_instruction_prompt_wraps_context_and_query() {
        let prompt = build_instruction_prompt("ctx", "which proteins clot blood?");
        assert!(prompt.starts_with("Based ONLY on this context: 'ctx'."));
        assert!(prompt.ends_with("which proteins clot blood?"));
    }

    #[test]
    fn test_strip_prompt_echo() {
        let prompt = "Based ONLY on this context...";
        let raw = format!("{} Prothrombin is the answer.", prompt);
        assert_eq!(strip_prompt_echo(prompt, &raw), "Prothrombin is the answer.");
    }

    #[test]
    fn test_strip_prompt_echo_without_echo() {
        assert_eq!(strip_prompt_echo("prompt", "  plain answer  "), "plain answer");
    }

    #[test]
    fn test_strip_prompt_echo_empty_completion() {
        assert_eq!(strip_prompt_echo("prompt", "prompt"), "");
    }

    #[tokio::test]
    async fn test_generate_without_contexts_returns_fixed_message() {
        let ctx = ServiceContext {
            config: AppConfig::default(),
            proteins: ProteinTable::new(vec!["Entry_Name".to_string()], Vec::new()),
            embeddings: Vec::new(),
            embedding_service: EmbeddingService::new(
                crate::domain::llm_config::LLMConfig::local_embedding(),
            ),
            llm_client: Arc::new(PanicClient),
            db_path: std::env::temp_dir().join("bioquery-unused.db"),
        };
        let generator = ResponseGenerator::new(&ctx);
        assert_eq!(generator.generate("anything").await, NO_CONTEXT_MESSAGE);
    }
}
