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

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pvmon_client::{ClientResult, DeviceCache, PvmonClient};
use pvmon_core::{DashboardEvent, EventBus};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::fixture::FixtureSource;
use crate::source::{PlantDataSource, RemoteSource};

/// Everything a handler needs, injected through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub source: Arc<dyn PlantDataSource>,
    pub events: EventBus,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .field("events", &self.events)
            .finish()
    }
}

impl AppState {
    pub fn new(config: ServerConfig, source: Arc<dyn PlantDataSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            events: EventBus::default(),
        }
    }

    /// Builds the data source the config asks for.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let source: Arc<dyn PlantDataSource> = match (&config.backend, &config.fixtures) {
            (Some(backend), _) => {
                let cache = DeviceCache::new(&config.cache.path).with_ttl(config.cache.ttl());
                let client = PvmonClient::with_timeout(
                    backend.base_url.clone(),
                    backend.token.clone(),
                    backend.timeout(),
                )?
                .with_retry_config(backend.max_retries, backend.retry_delay())
                .with_cache(cache);
                Arc::new(RemoteSource::new(client))
            }
            (None, Some(fixtures)) => Arc::new(FixtureSource::from_file(&fixtures.path)?),
            (None, None) => anyhow::bail!("no data source configured"),
        };
        Ok(Self::new(config, source))
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.config.ui.page_size
    }

    /// Reloads the device list and tells every connected browser.
    pub async fn refresh(&self) -> ClientResult<usize> {
        let source = self.source.name();
        let count = self.source.refresh().await?;
        info!(source, count, "Device list refreshed");
        self.events.publish(DashboardEvent::DataRefreshed {
            source: source.to_owned(),
            count,
        });
        Ok(count)
    }

    /// Refreshes in the background every `interval`, skipping the immediate
    /// first tick.
    pub fn spawn_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = state.refresh().await {
                    error!(error = %e, "Background refresh failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureData, FixtureSource};
    use pvmon_types::Device;
    use serde_json::json;

    fn state_with_devices(count: usize) -> AppState {
        let devices: Vec<Device> = (0..count)
            .map(|i| {
                serde_json::from_value(json!({"id": format!("d{i}"), "name": format!("D{i}")}))
                    .expect("device")
            })
            .collect();
        let source = FixtureSource::new(FixtureData {
            devices,
            ..FixtureData::default()
        });
        AppState::new(ServerConfig::with_fixtures("unused.json"), Arc::new(source))
    }

    #[tokio::test]
    async fn test_refresh_publishes_event() {
        let state = state_with_devices(3);
        let mut events = state.events.subscribe();

        let count = state.refresh().await.expect("refresh");
        assert_eq!(count, 3);

        let event = events.recv().await.expect("event");
        assert_eq!(
            event,
            DashboardEvent::DataRefreshed {
                source: "fixture".to_owned(),
                count: 3
            }
        );
    }

    #[test]
    fn test_from_config_requires_source() {
        let mut config = ServerConfig::with_fixtures("x");
        config.fixtures = None;
        assert!(AppState::from_config(config).is_err());
    }
}
