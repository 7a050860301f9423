//! Top-level request dispatch: picks the RAG or SQL pipeline and assembles
//! the response envelope.

use crate::application::context::ServiceContext;
use crate::application::use_cases::query_executor::QueryExecutor;
use crate::application::use_cases::response_generator::ResponseGenerator;
use crate::application::use_cases::result_formatter::ResultFormatter;
use crate::application::use_cases::semantic_retriever::{
    RetrievedContext, SemanticRetriever, DEFAULT_TOP_K,
};
use crate::application::use_cases::sql_translator::SqlTranslator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Strategy selected per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Rag,
    Sql,
}

impl QueryMode {
    /// Case-insensitive parse; anything but `rag`/`sql` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("rag") {
            Some(QueryMode::Rag)
        } else if value.eq_ignore_ascii_case("sql") {
            Some(QueryMode::Sql)
        } else {
            None
        }
    }
}

/// Response envelope. Constructed fresh per request and never mutated after
/// being returned; fields stay `None` unless the taken pipeline populated
/// them, and whatever was populated before a failure survives alongside the
/// error message.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub model_type: String,
    pub user_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_contexts: Option<Vec<RetrievedContext>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResponse {
    fn new(model_type: &str, user_query: &str) -> Self {
        Self {
            status: "success".to_string(),
            model_type: model_type.to_uppercase(),
            user_query: user_query.to_string(),
            response: None,
            retrieved_contexts: None,
            sql_query: None,
            count: None,
            data: None,
            message: None,
        }
    }

    fn fail(&mut self, message: String) {
        self.status = "error".to_string();
        self.message = Some(message);
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Stateless per-request dispatcher over the shared read-only context.
pub struct HybridDispatcher<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> HybridDispatcher<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn dispatch(&self, user_query: &str, model_type: &str) -> QueryResponse {
        let mut results = QueryResponse::new(model_type, user_query);

        match QueryMode::parse(model_type) {
            Some(QueryMode::Rag) => self.dispatch_rag(user_query, &mut results).await,
            Some(QueryMode::Sql) => self.dispatch_sql(user_query, &mut results).await,
            None => results.fail(format!(
                "Invalid model_type specified: {}. Use 'rag' or 'sql'.",
                model_type
            )),
        }

        info!(
            mode = %results.model_type,
            status = %results.status,
            "Dispatched query"
        );
        results
    }

    async fn dispatch_rag(&self, user_query: &str, results: &mut QueryResponse) {
        let generator = ResponseGenerator::new(self.ctx);
        results.response = Some(generator.generate(user_query).await);

        // Retrieval runs again independently so the caller sees which
        // contexts informed the answer.
        let retriever = SemanticRetriever::new(self.ctx);
        results.retrieved_contexts = Some(retriever.search(user_query, DEFAULT_TOP_K).await);
    }

    async fn dispatch_sql(&self, user_query: &str, results: &mut QueryResponse) {
        let translator = SqlTranslator::new(&self.ctx.config.table_name);
        let sql_query = translator.translate(user_query);
        results.sql_query = Some(sql_query.clone());

        let executor = QueryExecutor::new(&self.ctx.db_path);
        let formatter = ResultFormatter::new(self.ctx.config.top_results);

        let formatted = match executor.execute(&sql_query).await {
            Ok(table) => formatter.format(&table),
            Err(e) => Err(e),
        };

        match formatted {
            Ok(result) => {
                results.count = Some(result.count);
                results.data = Some(result.data);
                results.message = Some(result.message);
            }
            Err(e) => results.fail(e.to_string()),
        }
    }
}
