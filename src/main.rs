use bioquery::infrastructure::bootstrap;
use bioquery::infrastructure::config::AppConfig;
use bioquery::interfaces::http;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let host = config.host.clone();
    let port = config.port;

    let ctx = match bootstrap::initialize(config).await {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            // InitializationError is fatal: never serve with a partial context.
            error!(error = %e, "Failed to initialize service");
            std::process::exit(1);
        }
    };

    let logs = Arc::new(Mutex::new(Vec::new()));

    info!(host = %host, port, "Starting BioQuery API");
    let server = http::start_server(ctx.clone(), logs, &host, port)?;
    let result = server.await;

    bootstrap::cleanup(&ctx);
    result
}
