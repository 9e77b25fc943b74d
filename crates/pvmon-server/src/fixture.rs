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

//! Static data source backed by a JSON fixture file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use pvmon_client::{ClientError, ClientResult};
use pvmon_types::{
    Alert, Device, JobState, MaintenanceTask, NewJob, Plant, SchedulerJob, SchedulerStatus,
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::source::PlantDataSource;

/// Top-level layout of a fixture file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default, alias = "maintenance_tasks", alias = "tasks")]
    pub maintenance: Vec<MaintenanceTask>,
    #[serde(default)]
    pub scheduler: SchedulerStatus,
}

/// Serves a fixture loaded once at startup. Scheduler job operations
/// mutate an in-memory copy of the job list.
#[derive(Debug)]
pub struct FixtureSource {
    data: FixtureData,
    jobs: RwLock<Vec<SchedulerJob>>,
}

impl FixtureSource {
    #[must_use]
    pub fn new(mut data: FixtureData) -> Self {
        let jobs = std::mem::take(&mut data.scheduler.jobs);
        Self {
            data,
            jobs: RwLock::new(jobs),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        let source = Self::from_json(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))?;
        info!(
            path = %path.display(),
            plants = source.data.plants.len(),
            devices = source.data.devices.len(),
            "Loaded fixture data"
        );
        Ok(source)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let data: FixtureData = serde_json::from_str(content)?;
        Ok(Self::new(data))
    }

    fn update_job(&self, id: &str, update: impl FnOnce(&mut SchedulerJob)) -> ClientResult<()> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("scheduler job {id}")))?;
        update(job);
        debug!(job = id, state = %job.state, "Updated fixture job");
        Ok(())
    }

    fn next_job_id(jobs: &[SchedulerJob], name: &str) -> String {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let slug = slug.trim_matches('-');
        let base = if slug.is_empty() { "job" } else { slug };

        let mut candidate = base.to_owned();
        let mut suffix = 2;
        while jobs.iter().any(|j| j.id == candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        candidate
    }
}

#[async_trait]
impl PlantDataSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn devices(&self) -> ClientResult<Vec<Device>> {
        Ok(self.data.devices.clone())
    }

    async fn plants(&self) -> ClientResult<Vec<Plant>> {
        Ok(self.data.plants.clone())
    }

    async fn plant(&self, id: &str) -> ClientResult<Plant> {
        self.data
            .plants
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("plant {id}")))
    }

    async fn alerts(&self) -> ClientResult<Vec<Alert>> {
        Ok(self.data.alerts.clone())
    }

    async fn maintenance_tasks(&self) -> ClientResult<Vec<MaintenanceTask>> {
        Ok(self.data.maintenance.clone())
    }

    async fn scheduler_status(&self) -> ClientResult<SchedulerStatus> {
        Ok(SchedulerStatus {
            running: self.data.scheduler.running,
            jobs: self.jobs.read().clone(),
        })
    }

    async fn create_job(&self, job: NewJob) -> ClientResult<()> {
        job.validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let mut jobs = self.jobs.write();
        let id = Self::next_job_id(&jobs, &job.name);
        info!(job = %id, "Created fixture job");
        jobs.push(SchedulerJob {
            id,
            name: Some(job.name),
            job_type: Some(job.job_type),
            cron: Some(job.cron),
            state: JobState::Scheduled,
            next_run_time: None,
            last_run_time: None,
        });
        Ok(())
    }

    async fn pause_job(&self, id: &str) -> ClientResult<()> {
        self.update_job(id, |job| job.state = JobState::Paused)
    }

    async fn resume_job(&self, id: &str) -> ClientResult<()> {
        self.update_job(id, |job| job.state = JobState::Scheduled)
    }

    async fn delete_job(&self, id: &str) -> ClientResult<()> {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        if jobs.len() == before {
            return Err(ClientError::NotFound(format!("scheduler job {id}")));
        }
        info!(job = id, "Deleted fixture job");
        Ok(())
    }

    async fn run_job_now(&self, id: &str) -> ClientResult<()> {
        self.update_job(id, |job| job.last_run_time = Some(Utc::now()))
    }
}
