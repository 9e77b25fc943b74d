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

//! Payloads of the external job scheduler (`/api/scheduler/*`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::string_enum;
use crate::lenient;

string_enum! {
    pub enum JobState {
        Scheduled => "scheduled" | "active" | "pending",
        Paused => "paused",
        Running => "running",
    }
    fallback = Scheduled;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerJob {
    #[serde(deserialize_with = "lenient::text", alias = "job_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "type", alias = "func")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "trigger")]
    pub cron: Option<String>,
    #[serde(default, alias = "status")]
    pub state: JobState,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub next_run_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub last_run_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    #[serde(default, deserialize_with = "lenient::lenient_bool")]
    pub running: bool,
    #[serde(default)]
    pub jobs: Vec<SchedulerJob>,
}

impl SchedulerStatus {
    #[must_use]
    pub fn job(&self, id: &str) -> Option<&SchedulerJob> {
        self.jobs.iter().find(|j| j.id == id)
    }
}

/// Request body for `POST /api/scheduler/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    pub job_type: String,
    pub cron: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_id: Option<String>,
}

impl NewJob {
    /// Checks the fields the scheduler would otherwise reject with an opaque
    /// error: non-empty name and type, five-field cron expression.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("job name must not be empty");
        }
        if self.job_type.trim().is_empty() {
            anyhow::bail!("job type must not be empty");
        }
        let fields = self.cron.split_whitespace().count();
        if fields != 5 {
            anyhow::bail!("cron expression must have 5 fields, got {fields}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_payload() {
        let status: SchedulerStatus = serde_json::from_value(json!({
            "running": true,
            "jobs": [
                {"id": "daily-report", "name": "Daily report", "trigger": "0 6 * * *",
                 "next_run_time": "2025-06-02T06:00:00+00:00"},
                {"job_id": 7, "status": "paused"}
            ]
        }))
        .unwrap();
        assert!(status.running);
        assert_eq!(status.jobs.len(), 2);
        assert_eq!(status.job("7").map(|j| j.state), Some(JobState::Paused));
        assert_eq!(
            status.job("daily-report").and_then(|j| j.cron.as_deref()),
            Some("0 6 * * *")
        );
    }

    #[test]
    fn test_new_job_validation() {
        let mut job = NewJob {
            name: "Cleaning reminder".to_owned(),
            job_type: "maintenance_reminder".to_owned(),
            cron: "0 8 * * 1".to_owned(),
            plant_id: None,
        };
        assert!(job.validate().is_ok());

        job.cron = "every monday".to_owned();
        assert!(job.validate().is_err());
    }
}
