use crate::domain::protein::ProteinTable;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::embeddings::EmbeddingService;
use crate::infrastructure::llm_clients::LLMClient;
use std::path::PathBuf;
use std::sync::Arc;

/// Immutable dependency bundle for the query engines.
///
/// Built once during startup and shared by reference across requests; nothing
/// in here is mutated after construction, so concurrent readers need no
/// locking. Holds the database *path* rather than a connection — SQLite
/// handles are not shared across requests (see `QueryExecutor`).
///
/// Invariant: `embeddings` is index-aligned with `proteins.rows`; row `i` of
/// the matrix is the embedding of record `i`'s context. Bootstrap verifies
/// this before the context is constructed.
pub struct ServiceContext {
    pub config: AppConfig,
    pub proteins: ProteinTable,
    pub embeddings: Vec<Vec<f32>>,
    pub embedding_service: EmbeddingService,
    pub llm_client: Arc<dyn LLMClient>,
    pub db_path: PathBuf,
}
