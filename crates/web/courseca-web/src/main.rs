use anyhow::{Context, Result};
use courseca_identity_core::ProviderKind;
use courseca_identity_local::{InMemoryProviderRegistry, StudentDirectory};
use courseca_web::{AppConfig, AppState, app};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter()))
        .with_target(false)
        .init();

    let providers = InMemoryProviderRegistry::new();
    let google = providers
        .accept_provider("Google", ProviderKind::Google, "https://accounts.google.com")
        .await;
    info!("Accepting external logins from {} (id {})", google.name, google.id);

    let state = AppState::new(
        config.session_config()?,
        config.google.clone(),
        Arc::new(providers),
        Arc::new(StudentDirectory::new()),
    )?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Courseca listening on http://{}", addr);
    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
