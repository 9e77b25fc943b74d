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

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::table::MAX_PAGE_SIZE;

pub const BACKEND_URL_ENV: &str = "PVMON_BACKEND_URL";
pub const BACKEND_TOKEN_ENV: &str = "PVMON_BACKEND_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: Option<BackendSettings>,
    #[serde(default)]
    pub fixtures: Option<FixtureSettings>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSettings {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_cache_path() -> String {
    "./data/device_cache.json".to_owned()
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_page_size() -> usize {
    pvmon_core::listing::DEFAULT_PAGE_SIZE
}

fn default_chart_width() -> u32 {
    800
}

fn default_chart_height() -> u32 {
    480
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl BackendSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl CacheSettings {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config = Self::parse(&content)?;
        config.apply_env_fallbacks(
            std::env::var(BACKEND_URL_ENV).ok(),
            std::env::var(BACKEND_TOKEN_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Config for serving a fixture file with every other setting at its
    /// default.
    #[must_use]
    pub fn with_fixtures(path: impl Into<String>) -> Self {
        Self {
            server: ServerSettings::default(),
            backend: None,
            fixtures: Some(FixtureSettings { path: path.into() }),
            cache: CacheSettings::default(),
            ui: UiSettings::default(),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// Fills backend URL and token from the environment where the file left
    /// them unset. A config with neither backend nor fixtures gets a backend
    /// section when a URL is available.
    pub fn apply_env_fallbacks(&mut self, url: Option<String>, token: Option<String>) {
        let url = url.filter(|u| !u.trim().is_empty());
        let token = token.filter(|t| !t.trim().is_empty());

        if self.backend.is_none()
            && self.fixtures.is_none()
            && let Some(url) = &url
        {
            self.backend = Some(BackendSettings::new(url.clone()));
        }

        if let Some(backend) = &mut self.backend {
            if backend.base_url.trim().is_empty()
                && let Some(url) = url
            {
                backend.base_url = url;
            }
            if backend.token.as_deref().is_none_or(|t| t.trim().is_empty()) {
                backend.token = token;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.backend, &self.fixtures) {
            (Some(_), Some(_)) => bail!("configure either [backend] or [fixtures], not both"),
            (None, None) => bail!(
                "no data source: set [backend] base_url, {BACKEND_URL_ENV}, or [fixtures] path"
            ),
            (Some(backend), None) => {
                let url = backend.base_url.trim();
                if url.is_empty() {
                    bail!("backend.base_url must be set");
                }
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    bail!("backend.base_url must start with http:// or https://, got {url}");
                }
                if backend.max_retries == 0 {
                    bail!("backend.max_retries must be at least 1");
                }
                if backend.timeout_secs == 0 {
                    bail!("backend.timeout_secs must be at least 1");
                }
            }
            (None, Some(fixtures)) => {
                if fixtures.path.trim().is_empty() {
                    bail!("fixtures.path must be set");
                }
            }
        }
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be at least 1");
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.ui.page_size) {
            bail!("ui.page_size must be between 1 and {MAX_PAGE_SIZE}");
        }
        if self.ui.chart_width < 200 || self.ui.chart_height < 150 {
            bail!("ui.chart_width/chart_height are too small to draw a chart");
        }
        Ok(())
    }
}
