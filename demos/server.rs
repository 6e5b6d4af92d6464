//! Demo server: config from `LAZYREST_CONFIG` (JSON file) or `LAZYREST_*` env vars, routes from the live schema.

use lazyrest::{Engine, GlobalConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lazyrest=info".parse()?))
        .init();

    let config = match std::env::var("LAZYREST_CONFIG") {
        Ok(path) => GlobalConfig::from_json_file(path).await?,
        Err(_) => GlobalConfig::from_env().await?,
    };
    let engine = Engine::connect(config).await?;

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".into());
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    engine.serve(listener).await?;
    Ok(())
}
