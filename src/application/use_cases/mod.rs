pub mod hybrid_dispatcher;
pub mod query_executor;
pub mod response_generator;
pub mod result_formatter;
pub mod semantic_retriever;
pub mod sql_translator;
