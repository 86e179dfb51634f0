//! Automation API server
//!
//! Usage: `automation-api [SETTINGS_FILE]`

use anyhow::Result;
use automation_server::{build_state, settings_path, Settings, SETTINGS_ENV_VAR};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let path = settings_path(
        std::env::args().nth(1),
        std::env::var(SETTINGS_ENV_VAR).ok(),
    );
    info!("Loading settings from {:?}", path);
    let settings = Settings::load(&path)?;

    let state = build_state(&settings).await?;

    automation_api::start_server(state, &settings.bind, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
        }
    })
    .await?;

    Ok(())
}
