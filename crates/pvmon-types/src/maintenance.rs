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

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::string_enum;
use crate::lenient;

string_enum! {
    pub enum TaskStatus {
        Pending => "pending" | "open" | "todo" | "scheduled",
        InProgress => "in_progress" | "started" | "active",
        Completed => "completed" | "done" | "closed",
        Cancelled => "cancelled" | "canceled",
    }
    fallback = Pending;
}

string_enum! {
    pub enum TaskPriority {
        Low => "low",
        Medium => "medium" | "normal",
        High => "high",
        Urgent => "urgent" | "critical",
    }
    fallback = Medium;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceTask {
    #[serde(deserialize_with = "lenient::text", alias = "task_id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        alias = "name",
        alias = "description"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        alias = "plantId",
        alias = "plant"
    )]
    pub plant_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        alias = "deviceId",
        alias = "device"
    )]
    pub device_id: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        alias = "assigned_to",
        alias = "technician"
    )]
    pub assignee: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        alias = "due",
        alias = "scheduled_date"
    )]
    pub due_date: Option<NaiveDate>,
}

impl MaintenanceTask {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// Open and past its due date.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date.is_some_and(|due| due < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_aliases_and_overdue() {
        let task: MaintenanceTask = serde_json::from_value(json!({
            "task_id": "t-1",
            "name": "Panel cleaning",
            "status": "In Progress",
            "priority": "critical",
            "assigned_to": "crew-2",
            "due": "2025-05-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert_eq!(task.assignee.as_deref(), Some("crew-2"));

        let today = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        assert!(task.is_overdue(today));
    }

    #[test]
    fn test_completed_task_is_never_overdue() {
        let task: MaintenanceTask = serde_json::from_value(json!({
            "id": 5,
            "status": "done",
            "due_date": "2020-01-01"
        }))
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(!task.is_overdue(today));
    }
}
