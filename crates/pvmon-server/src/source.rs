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

//! Where the dashboard gets its records from.

use async_trait::async_trait;
use pvmon_client::{ClientResult, PvmonClient};
use pvmon_types::{Alert, Device, MaintenanceTask, NewJob, Plant, SchedulerStatus};
use tracing::info;

/// Read access to plant data plus the scheduler job operations.
///
/// Handlers only see this trait, never a concrete backend.
#[async_trait]
pub trait PlantDataSource: Send + Sync {
    /// Source name for logging and refresh events
    fn name(&self) -> &'static str;

    async fn devices(&self) -> ClientResult<Vec<Device>>;

    async fn plants(&self) -> ClientResult<Vec<Plant>>;

    async fn plant(&self, id: &str) -> ClientResult<Plant>;

    async fn alerts(&self) -> ClientResult<Vec<Alert>>;

    async fn maintenance_tasks(&self) -> ClientResult<Vec<MaintenanceTask>>;

    async fn scheduler_status(&self) -> ClientResult<SchedulerStatus>;

    async fn create_job(&self, job: NewJob) -> ClientResult<()>;

    async fn pause_job(&self, id: &str) -> ClientResult<()>;

    async fn resume_job(&self, id: &str) -> ClientResult<()>;

    async fn delete_job(&self, id: &str) -> ClientResult<()>;

    async fn run_job_now(&self, id: &str) -> ClientResult<()>;

    /// Drops any cached state and reloads the device list. Returns the
    /// number of devices now known.
    async fn refresh(&self) -> ClientResult<usize> {
        Ok(self.devices().await?.len())
    }
}

/// Live backend behind [`PvmonClient`].
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: PvmonClient,
}

impl RemoteSource {
    #[must_use]
    pub fn new(client: PvmonClient) -> Self {
        info!(base_url = client.base_url(), "Using remote plant data source");
        Self { client }
    }
}

#[async_trait]
impl PlantDataSource for RemoteSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn devices(&self) -> ClientResult<Vec<Device>> {
        self.client.devices().await
    }

    async fn plants(&self) -> ClientResult<Vec<Plant>> {
        self.client.plants().await
    }

    async fn plant(&self, id: &str) -> ClientResult<Plant> {
        self.client.plant(id).await
    }

    async fn alerts(&self) -> ClientResult<Vec<Alert>> {
        self.client.alerts().await
    }

    async fn maintenance_tasks(&self) -> ClientResult<Vec<MaintenanceTask>> {
        self.client.maintenance_tasks().await
    }

    async fn scheduler_status(&self) -> ClientResult<SchedulerStatus> {
        self.client.scheduler_status().await
    }

    async fn create_job(&self, job: NewJob) -> ClientResult<()> {
        self.client.create_job(&job).await
    }

    async fn pause_job(&self, id: &str) -> ClientResult<()> {
        self.client.pause_job(id).await
    }

    async fn resume_job(&self, id: &str) -> ClientResult<()> {
        self.client.resume_job(id).await
    }

    async fn delete_job(&self, id: &str) -> ClientResult<()> {
        self.client.delete_job(id).await
    }

    async fn run_job_now(&self, id: &str) -> ClientResult<()> {
        self.client.run_job_now(id).await
    }

    async fn refresh(&self) -> ClientResult<usize> {
        let devices = self.client.fetch_devices().await?;
        self.client.store_devices(&devices).await;
        Ok(devices.len())
    }
}
