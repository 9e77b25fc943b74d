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

//! On-disk cache of the device list.

use crate::errors::ClientResult;
use chrono::{DateTime, Utc};
use pvmon_types::Device;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Device lists older than this are refetched.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct CacheFile {
    fetched_at: DateTime<Utc>,
    devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
struct CacheFileRef<'a> {
    fetched_at: DateTime<Utc>,
    devices: &'a [Device],
}

/// JSON file holding the last fetched device list and when it was fetched.
///
/// Clones share one lock, so concurrent refreshes never interleave writes.
#[derive(Debug, Clone)]
pub struct DeviceCache {
    path: PathBuf,
    ttl: Duration,
    lock: Arc<Mutex<()>>,
}

impl DeviceCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached devices if the entry is younger than the TTL.
    ///
    /// A missing or unreadable cache file is a miss, not an error.
    pub async fn load_fresh(&self, now: DateTime<Utc>) -> ClientResult<Option<Vec<Device>>> {
        let _guard = self.lock.lock().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let cached: CacheFile = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt device cache");
                return Ok(None);
            }
        };

        // Negative age (clock moved backwards) counts as fresh
        let age = now.signed_duration_since(cached.fetched_at);
        if let Ok(age) = age.to_std()
            && age > self.ttl
        {
            debug!(age_secs = age.as_secs(), "Device cache expired");
            return Ok(None);
        }

        debug!(devices = cached.devices.len(), "Device cache hit");
        Ok(Some(cached.devices))
    }

    /// Replaces the cache contents. Writes to a temporary file first and
    /// renames it over the old one.
    pub async fn store(&self, devices: &[Device], fetched_at: DateTime<Utc>) -> ClientResult<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string(&CacheFileRef {
            fetched_at,
            devices,
        })?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(devices = devices.len(), path = %self.path.display(), "Stored device cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::tempdir;

    fn devices() -> Vec<Device> {
        serde_json::from_value(serde_json::json!([
            {"id": "d-1", "name": "Inverter 1", "type": "inverter", "status": "online", "power": 4.2},
            {"id": "d-2", "name": "Meter", "type": "meter", "status": "offline"}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::new(dir.path().join("devices.json"));
        assert!(cache.load_fresh(Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::new(dir.path().join("cache/devices.json"));
        let now = Utc::now();

        cache.store(&devices(), now).await.unwrap();
        assert!(!cache.path().with_extension("tmp").exists());

        let loaded = cache.load_fresh(now + TimeDelta::minutes(4)).await.unwrap();
        assert_eq!(loaded, Some(devices()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_ignored() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::new(dir.path().join("devices.json"));
        let fetched_at = Utc::now() - TimeDelta::minutes(6);

        cache.store(&devices(), fetched_at).await.unwrap();
        assert!(cache.load_fresh(Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let dir = tempdir().unwrap();
        let cache =
            DeviceCache::new(dir.path().join("devices.json")).with_ttl(Duration::from_secs(10));
        let fetched_at = Utc::now() - TimeDelta::seconds(30);

        cache.store(&devices(), fetched_at).await.unwrap();
        assert!(cache.load_fresh(Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = DeviceCache::new(&path);
        assert!(cache.load_fresh(Utc::now()).await.unwrap().is_none());
    }
}
