//! HTTP boundary for the hybrid query service.

use crate::application::use_cases::hybrid_dispatcher::{HybridDispatcher, QueryMode};
use crate::application::ServiceContext;
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub ctx: Arc<ServiceContext>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 4096))]
    pub query: String,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

fn default_model_type() -> String {
    "rag".to_string()
}

fn bad_request() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "status": "error",
        "message": "Invalid 'query' or 'model_type'. Use 'rag' or 'sql'."
    }))
}

/// Hybrid endpoint: the caller picks the underlying model per request.
#[post("/query")]
async fn query(data: web::Data<HttpState>, req: web::Json<QueryRequest>) -> impl Responder {
    // Shape validation happens before anything reaches the engine.
    if req.validate().is_err() || QueryMode::parse(&req.model_type).is_none() {
        return bad_request();
    }

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Dispatching {} query: {}", req.model_type, req.query),
    );

    let dispatcher = HybridDispatcher::new(&data.ctx);
    let results = dispatcher.dispatch(&req.query, &req.model_type).await;

    if results.is_success() {
        HttpResponse::Ok().json(results)
    } else {
        add_log(
            &data.logs,
            "ERROR",
            "HttpApi",
            results.message.as_deref().unwrap_or("Query failed"),
        );
        HttpResponse::InternalServerError().json(results)
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().map(|l| l.clone()).unwrap_or_default();
    HttpResponse::Ok().json(logs)
}

#[get("/")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("BioQuery Service is operational. Use POST /api/query.")
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry);
        if logs.len() > 100 {
            logs.remove(0);
        }
    }
}

pub fn start_server(
    ctx: Arc<ServiceContext>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    host: &str,
    port: u16,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { ctx, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Local tool, any origin may call it

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(health_check)
            .service(web::scope("/api").service(query).service(get_logs))
    })
    .bind((host, port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_defaults_to_rag() {
        let req: QueryRequest = serde_json::from_str(r#"{"query": "hello"}"#).unwrap();
        assert_eq!(req.model_type, "rag");
    }

    #[test]
    fn test_empty_query_fails_validation() {
        let req: QueryRequest = serde_json::from_str(r#"{"query": ""}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_log_ring_is_bounded() {
        let logs = Mutex::new(Vec::new());
        for i in 0..150 {
            add_log(&logs, "INFO", "test", &format!("entry {}", i));
        }
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), 100);
        assert_eq!(logs.last().unwrap().message, "entry 149");
    }
}
