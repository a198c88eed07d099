//! Prediction gateway binary.

use std::env;
use std::sync::Arc;

use predict_gateway::{api, logging, AppState, Config};
use tokio::net::TcpListener;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    if env::args().any(|a| a == "--version" || a == "-V") {
        println!("predict-gateway {}", VERSION);
        return Ok(());
    }

    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check config.toml or the PREDICT__SECTION__KEY environment variables.",
            e
        )
    })?;

    logging::init(&config.logging.level);

    tracing::info!("Starting predict-gateway {}", VERSION);
    tracing::info!(
        "Worker: {} {:?} (max {} concurrent, {}s timeout, {:?} protocol)",
        config.worker.program,
        config.worker.args,
        config.worker.max_concurrent,
        config.worker.timeout_secs,
        config.worker.protocol
    );
    if config.services.is_empty() {
        tracing::warn!("No procedure codes configured, every prediction will be rejected");
    } else {
        tracing::info!("Loaded {} procedure codes", config.services.len());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config));
    let app = api::app(state);

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
