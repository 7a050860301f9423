//! Startup orchestration.
//!
//! Loads the dataset, materializes the SQLite table, loads or computes the
//! embedding matrix and wires the backends into a [`ServiceContext`]. Any
//! failure here is fatal — the server must not begin serving with a partial
//! context.

use crate::application::context::ServiceContext;
use crate::domain::error::{AppError, Result};
use crate::domain::protein::ProteinTable;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::dataset::load_protein_table;
use crate::infrastructure::db::init_database;
use crate::infrastructure::embeddings::{load_matrix, save_matrix, EmbeddingService};
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn initialize(config: AppConfig) -> Result<ServiceContext> {
    if !config.dataset_path.exists() {
        return Err(AppError::NotFound(format!(
            "Dataset file not found: {}. Cannot start service.",
            config.dataset_path.display()
        )));
    }

    let proteins = load_protein_table(&config.dataset_path)?;
    info!(records = proteins.len(), "Loaded protein dataset");

    let db_path = temp_db_path();
    init_database(&db_path, &config.table_name, &proteins).await?;

    let embedding_service = EmbeddingService::new(config.embedding.clone());
    let embeddings = load_or_build_embeddings(&config, &proteins, &embedding_service).await?;

    // Row alignment is the retrieval correctness invariant; a mismatch here
    // would pair records with the wrong vectors.
    if embeddings.len() != proteins.len() {
        return Err(AppError::Internal(format!(
            "Embedding matrix has {} rows but the dataset has {} records",
            embeddings.len(),
            proteins.len()
        )));
    }

    let llm_client: Arc<dyn LLMClient> = Arc::new(RouterClient::new());

    info!("Service initialization successful");
    Ok(ServiceContext {
        config,
        proteins,
        embeddings,
        embedding_service,
        llm_client,
        db_path,
    })
}

/// Remove the throwaway database file. Called once the server has stopped.
pub fn cleanup(ctx: &ServiceContext) {
    if ctx.db_path.exists() {
        if let Err(e) = std::fs::remove_file(&ctx.db_path) {
            warn!(error = %e, path = %ctx.db_path.display(), "Failed to remove database file");
        }
    }
}

fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("bioquery-{}.db", std::process::id()))
}

/// Load the persisted matrix when it matches the dataset, otherwise embed
/// every record context and persist the result.
async fn load_or_build_embeddings(
    config: &AppConfig,
    proteins: &ProteinTable,
    embedding_service: &EmbeddingService,
) -> Result<Vec<Vec<f32>>> {
    if config.embeddings_path.exists() {
        match load_matrix(&config.embeddings_path) {
            Ok(matrix) if matrix.len() == proteins.len() => {
                info!(
                    rows = matrix.len(),
                    path = %config.embeddings_path.display(),
                    "Loaded embedding matrix"
                );
                return Ok(matrix);
            }
            Ok(matrix) => warn!(
                artifact_rows = matrix.len(),
                dataset_rows = proteins.len(),
                "Embedding artifact is stale; regenerating"
            ),
            Err(e) => warn!(error = %e, "Embedding artifact unreadable; regenerating"),
        }
    }

    info!(
        records = proteins.len(),
        "Generating embeddings (one-time process)"
    );
    let texts: Vec<String> = (0..proteins.len())
        .map(|idx| proteins.context(idx).to_string())
        .collect();
    let matrix = embedding_service.embed_batch(&texts).await?;
    save_matrix(&config.embeddings_path, &matrix)?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_dataset_is_fatal() {
        let config = AppConfig {
            dataset_path: PathBuf::from("/nonexistent/uniprot.tsv"),
            ..AppConfig::default()
        };
        match initialize(config).await {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("Cannot start service")),
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }
}
