use std::time::Duration;

use anyhow::Context;
use catalog_service::prelude::*;

/// How often expired tokens are purged from the token store
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => Config::load().context("failed to load configuration")?,
    };
    init_tracing(&config);

    let state = AppState::builder()
        .config(config.clone())
        .build()
        .context("failed to build application state")?;
    let created = state.bootstrap().await.context("failed to create bootstrap accounts")?;
    tracing::info!(created, "bootstrap complete");

    let tokens = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = tokens.tokens().cleanup_expired().await {
                tracing::warn!(error = %e, "token cleanup failed");
            }
        }
    });

    Server::new(config).serve(router(state)).await?;
    Ok(())
}
