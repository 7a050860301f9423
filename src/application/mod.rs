pub mod context;
pub mod use_cases;

pub use context::ServiceContext;
pub use use_cases::hybrid_dispatcher::{HybridDispatcher, QueryMode, QueryResponse};
pub use use_cases::semantic_retriever::RetrievedContext;
