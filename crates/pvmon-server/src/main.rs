// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PVMon.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use tracing::info;
use tracing_subscriber::EnvFilter;

use pvmon_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pvmon_server=info,pvmon_client=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "server_config.toml".to_owned());
    info!(path = %config_path, "Loading configuration");
    let config = ServerConfig::from_file(&config_path)?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let refresh_every = config.backend.is_some().then(|| config.cache.ttl());
    let state = AppState::from_config(config)?;
    info!(source = state.source.name(), "Data source ready");

    if let Some(interval) = refresh_every {
        state.spawn_refresh(interval);
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("PVMon dashboard listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
