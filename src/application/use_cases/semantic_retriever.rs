//! Semantic nearest-neighbor retrieval over the precomputed embedding matrix.

use crate::application::context::ServiceContext;
use crate::domain::protein::ProteinTable;
use crate::infrastructure::embeddings::EmbeddingService;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// Number of contexts fed into response generation.
pub const DEFAULT_TOP_K: usize = 3;

/// One retrieved record: name, formatted similarity, and the context text
/// the embedding was computed from. Ephemeral, produced per request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetrievedContext {
    #[serde(rename = "Entry_Name")]
    pub entry_name: String,
    #[serde(rename = "Similarity_Score")]
    pub similarity_score: String,
    #[serde(rename = "Context_Bio")]
    pub context: String,
}

pub struct SemanticRetriever<'a> {
    proteins: &'a ProteinTable,
    embeddings: &'a [Vec<f32>],
    embedding_service: &'a EmbeddingService,
}

impl<'a> SemanticRetriever<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self {
            proteins: &ctx.proteins,
            embeddings: &ctx.embeddings,
            embedding_service: &ctx.embedding_service,
        }
    }

    /// Return the `min(top_k, N)` most similar records, descending by cosine
    /// similarity, ties broken by original record order.
    ///
    /// Retrieval degrades rather than fails: an empty table, an empty matrix
    /// or an embedding-backend failure all produce an empty result set.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<RetrievedContext> {
        if self.embeddings.is_empty() || self.proteins.is_empty() {
            return Vec::new();
        }

        let query_embedding = match self.embedding_service.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Query embedding failed; returning no contexts");
                return Vec::new();
            }
        };

        let similarities: Vec<f32> = self
            .embeddings
            .iter()
            .map(|row| EmbeddingService::cosine_similarity(&query_embedding, row))
            .collect();

        top_k_indices(&similarities, top_k)
            .into_iter()
            .map(|(idx, score)| RetrievedContext {
                entry_name: self.proteins.entry_name(idx).to_string(),
                similarity_score: format!("{:.4}", score),
                context: self.proteins.context(idx).to_string(),
            })
            .collect()
    }
}

/// Rank indices by descending score; equal scores keep ascending index order.
pub fn top_k_indices(similarities: &[f32], top_k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = similarities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    indexed.truncate(top_k);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMConfig;
    use crate::domain::protein::ProteinTable;

    #[test]
    fn test_top_k_orders_descending() {
        let ranked = top_k_indices(&[0.1, 0.9, 0.5], 3);
        assert_eq!(
            ranked.iter().map(|(idx, _)| *idx).collect::<Vec<_>>(),
            vec![1, 2, 0]
        );
    }

    #[test]
    fn test_top_k_returns_min_of_k_and_n() {
        assert_eq!(top_k_indices(&[0.3, 0.2], 5).len(), 2);
        assert_eq!(top_k_indices(&[0.3, 0.2, 0.1], 2).len(), 2);
    }

    #[test]
    fn test_ties_keep_original_order() {
        let ranked = top_k_indices(&[0.5, 0.7, 0.5, 0.5], 4);
        assert_eq!(
            ranked.iter().map(|(idx, _)| *idx).collect::<Vec<_>>(),
            vec![1, 0, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_empty_matrix() {
        let ctx = ServiceContext {
            config: crate::infrastructure::config::AppConfig::default(),
            proteins: ProteinTable::new(vec!["Entry_Name".to_string()], Vec::new()),
            embeddings: Vec::new(),
            embedding_service: EmbeddingService::new(LLMConfig::local_embedding()),
            llm_client: std::sync::Arc::new(crate::infrastructure::llm_clients::RouterClient::new()),
            db_path: std::env::temp_dir().join("bioquery-unused.db"),
        };
        let retriever = SemanticRetriever::new(&ctx);
        assert!(retriever.search("anything", DEFAULT_TOP_K).await.is_empty());
    }
}
