// src/main.rs

use anyhow::Context;
use std::net::TcpListener;

use seo_auditor::config::AppConfig;
use seo_auditor::lifecycle::{self, build_state};
use seo_auditor::repository::sqlite;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lifecycle::init_logging();

    let config = AppConfig::load()?;
    let pool = sqlite::connect(&config.database.url, config.database.max_connections).await?;
    let state = build_state(&config, pool)?;

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on http://{}", address);

    lifecycle::run(listener, state)?.await?;
    Ok(())
}
