use anyhow::Result;
use voyage_api::{build_app_with, ApiConfig};
use voyage_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("voyage_api");

    let config = ApiConfig::from_env();
    let bind = config.bind.clone();
    let app = build_app_with(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "voyage planner api started");

    axum::serve(listener, app).await?;
    Ok(())
}
