use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plant_disease_service::{routes, utils, AppState, ClassifierMode, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    if config.mode == ClassifierMode::Trained {
        if let Err(err) = utils::ensure_artifacts(&config.model_artifacts()).await {
            warn!("Could not fetch model artifacts: {:#}", err);
        }
    } else {
        info!("{}", "=".repeat(60));
        info!("PlantDoc AI - Demo Mode");
        info!("Predictions are simulated from leaf colors and filenames.");
        info!("{}", "=".repeat(60));
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::from_config(config));
    let app = routes::router(state);

    info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
