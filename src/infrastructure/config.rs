use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application-wide configuration.
///
/// Layered: compiled defaults, then `bioquery.toml`, then `BIOQUERY_*`
/// environment variables (nested fields via `__`, e.g. `BIOQUERY_LLM__MODEL`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// UniProt TSV export to serve queries over.
    pub dataset_path: PathBuf,
    /// Precomputed embedding matrix artifact, keyed to dataset row order.
    pub embeddings_path: PathBuf,
    /// SQL table name the dataset is materialized under.
    pub table_name: String,
    /// Page size for formatted SQL results.
    pub top_results: usize,
    pub host: String,
    pub port: u16,
    /// Generation backend.
    pub llm: LLMConfig,
    /// Embedding backend.
    pub embedding: LLMConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("db/uniprot.tsv"),
            embeddings_path: PathBuf::from("embeddings_proteomic.bin"),
            table_name: "proteins".to_string(),
            top_results: 5,
            host: "0.0.0.0".to_string(),
            port: 5000,
            llm: LLMConfig::default(),
            embedding: LLMConfig::local_embedding(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("bioquery.toml"))
            .merge(Env::prefixed("BIOQUERY_").split("__"))
            .extract()
            .map_err(|e| AppError::ParseError(format!("Invalid configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.table_name, "proteins");
        assert_eq!(config.top_results, 5);
        assert_eq!(config.embedding.provider, LLMProvider::Local);
        assert_eq!(config.llm.temperature, Some(0.0));
    }
}
