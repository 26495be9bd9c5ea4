use anyhow::Result;
use api::{router, SandboxConfig, SandboxState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PropTrade sandbox...");

    let config = SandboxConfig::from_env()?;
    let state = SandboxState::new(&config)?;
    info!("Seeded demo accounts, issuer {}", config.issuer);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Sandbox listening on http://{}", config.bind);
    info!("API available at: http://{}/api/v1", config.bind);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
