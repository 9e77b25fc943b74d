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

use pvmon_types::{Alert, Device, MaintenanceTask, Plant};

use super::{Column, ColumnKind, FieldValue, Listable};

const DEVICE_COLUMNS: &[Column] = &[
    Column::new("id", "ID", ColumnKind::Text),
    Column::new("name", "Name", ColumnKind::Text),
    Column::new("serial_number", "Serial number", ColumnKind::Text),
    Column::new("kind", "Type", ColumnKind::Text),
    Column::new("status", "Status", ColumnKind::Text),
    Column::new("plant", "Plant", ColumnKind::Text),
    Column::new("rated_power_kw", "Rated power (kW)", ColumnKind::Number),
    Column::new("current_power_kw", "Power (kW)", ColumnKind::Number),
    Column::new("last_seen", "Last seen", ColumnKind::Date),
];

impl Listable for Device {
    fn columns() -> &'static [Column] {
        DEVICE_COLUMNS
    }

    fn value(&self, key: &str) -> FieldValue {
        match key {
            "id" => FieldValue::Text(self.id.clone()),
            "name" => FieldValue::Text(self.name.clone()),
            "serial_number" => FieldValue::text(self.serial_number.as_deref()),
            "kind" => FieldValue::Text(self.kind.as_str().to_owned()),
            "status" => FieldValue::Text(self.status.as_str().to_owned()),
            "plant" => FieldValue::text(self.plant_name.as_deref().or(self.plant_id.as_deref())),
            "rated_power_kw" => FieldValue::number(self.rated_power_kw),
            "current_power_kw" => FieldValue::number(self.current_power_kw),
            "last_seen" => self.last_seen.map_or(FieldValue::Missing, FieldValue::Timestamp),
            _ => FieldValue::Missing,
        }
    }

    fn status_key(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn kind_key(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }

    fn plant_key(&self) -> Option<&str> {
        self.plant_id.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.id.as_str()),
            Some(self.name.as_str()),
            self.serial_number.as_deref(),
            self.model.as_deref(),
            self.manufacturer.as_deref(),
            self.plant_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn row_id(&self) -> &str {
        &self.id
    }
}

const ALERT_COLUMNS: &[Column] = &[
    Column::new("id", "ID", ColumnKind::Text),
    Column::new("severity", "Severity", ColumnKind::Ordinal),
    Column::new("plant_id", "Plant", ColumnKind::Text),
    Column::new("device_id", "Device", ColumnKind::Text),
    Column::new("message", "Message", ColumnKind::Text),
    Column::new("raised_at", "Raised", ColumnKind::Date),
    Column::new("state", "State", ColumnKind::Text),
];

fn alert_state(alert: &Alert) -> &'static str {
    if alert.acknowledged {
        "acknowledged"
    } else {
        "active"
    }
}

impl Listable for Alert {
    fn columns() -> &'static [Column] {
        ALERT_COLUMNS
    }

    fn value(&self, key: &str) -> FieldValue {
        match key {
            "id" => FieldValue::Text(self.id.clone()),
            "severity" => FieldValue::Ordinal {
                rank: self.severity as u8,
                label: self.severity.as_str(),
            },
            "plant_id" => FieldValue::text(self.plant_id.as_deref()),
            "device_id" => FieldValue::text(self.device_id.as_deref()),
            "message" => FieldValue::text(self.message.as_deref()),
            "raised_at" => self.raised_at.map_or(FieldValue::Missing, FieldValue::Timestamp),
            "state" => FieldValue::Text(alert_state(self).to_owned()),
            _ => FieldValue::Missing,
        }
    }

    /// Alerts filter on acknowledgement state.
    fn status_key(&self) -> Option<&str> {
        Some(alert_state(self))
    }

    fn kind_key(&self) -> Option<&str> {
        Some(self.severity.as_str())
    }

    fn plant_key(&self) -> Option<&str> {
        self.plant_id.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.id.as_str()),
            self.message.as_deref(),
            self.device_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn row_id(&self) -> &str {
        &self.id
    }
}

const TASK_COLUMNS: &[Column] = &[
    Column::new("id", "ID", ColumnKind::Text),
    Column::new("title", "Task", ColumnKind::Text),
    Column::new("plant_id", "Plant", ColumnKind::Text),
    Column::new("device_id", "Device", ColumnKind::Text),
    Column::new("status", "Status", ColumnKind::Text),
    Column::new("priority", "Priority", ColumnKind::Ordinal),
    Column::new("assignee", "Assignee", ColumnKind::Text),
    Column::new("due_date", "Due", ColumnKind::Date),
];

impl Listable for MaintenanceTask {
    fn columns() -> &'static [Column] {
        TASK_COLUMNS
    }

    fn value(&self, key: &str) -> FieldValue {
        match key {
            "id" => FieldValue::Text(self.id.clone()),
            "title" => FieldValue::text(self.title.as_deref()),
            "plant_id" => FieldValue::text(self.plant_id.as_deref()),
            "device_id" => FieldValue::text(self.device_id.as_deref()),
            "status" => FieldValue::Text(self.status.as_str().to_owned()),
            "priority" => FieldValue::Ordinal {
                rank: self.priority as u8,
                label: self.priority.as_str(),
            },
            "assignee" => FieldValue::text(self.assignee.as_deref()),
            "due_date" => self.due_date.map_or(FieldValue::Missing, FieldValue::Date),
            _ => FieldValue::Missing,
        }
    }

    fn status_key(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    /// Tasks use priority as their type facet.
    fn kind_key(&self) -> Option<&str> {
        Some(self.priority.as_str())
    }

    fn plant_key(&self) -> Option<&str> {
        self.plant_id.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.id.as_str()),
            self.title.as_deref(),
            self.assignee.as_deref(),
            self.device_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn row_id(&self) -> &str {
        &self.id
    }
}

const PLANT_COLUMNS: &[Column] = &[
    Column::new("id", "ID", ColumnKind::Text),
    Column::new("name", "Name", ColumnKind::Text),
    Column::new("location", "Location", ColumnKind::Text),
    Column::new("status", "Status", ColumnKind::Text),
    Column::new("capacity_kw", "Capacity (kW)", ColumnKind::Number),
    Column::new("device_count", "Devices", ColumnKind::Number),
    Column::new("today_energy_kwh", "Today (kWh)", ColumnKind::Number),
];

impl Listable for Plant {
    fn columns() -> &'static [Column] {
        PLANT_COLUMNS
    }

    fn value(&self, key: &str) -> FieldValue {
        match key {
            "id" => FieldValue::Text(self.id.clone()),
            "name" => FieldValue::Text(self.display_name().to_owned()),
            "location" => FieldValue::text(self.location.as_deref()),
            "status" => FieldValue::Text(self.status.as_str().to_owned()),
            "capacity_kw" => FieldValue::number(self.capacity_kw),
            "device_count" => FieldValue::number(self.device_count.map(f64::from)),
            "today_energy_kwh" => FieldValue::number(self.today_energy_kwh),
            _ => FieldValue::Missing,
        }
    }

    fn status_key(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn kind_key(&self) -> Option<&str> {
        None
    }

    fn plant_key(&self) -> Option<&str> {
        Some(self.id.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.id.as_str()),
            self.name.as_deref(),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn row_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ListFilter, ListView, SortDirection};
    use super::*;
    use pvmon_types::{AlertSeverity, DeviceStatus, TaskPriority};
    use serde_json::json;

    fn devices() -> Vec<Device> {
        serde_json::from_value(json!([
            {"id": "1", "name": "INV-A", "type": "inverter", "status": "online", "plant_id": "p1", "power": 4.0},
            {"id": "2", "name": "MTR-A", "type": "meter", "status": "offline", "plant_id": "p1"},
            {"id": "3", "name": "INV-B", "type": "inverter", "status": "offline", "plant_id": "p2", "power": 12.5,
             "manufacturer": "Huawei"},
            {"id": "4", "name": "INV-C", "type": "inverter", "status": "warning", "plant_id": "p2", "power": 9.0}
        ]))
        .unwrap()
    }

    #[test]
    fn test_device_filters() {
        let mut view = ListView::new(devices());
        view.set_filter(ListFilter {
            status: Some("Offline".to_owned()),
            kind: Some("inverter".to_owned()),
            ..ListFilter::default()
        });
        let ids: Vec<&str> = view.filtered().iter().map(|d| d.row_id()).collect();
        assert_eq!(ids, vec!["3"]);
        assert_eq!(view.filtered()[0].status, DeviceStatus::Offline);

        view.set_filter(ListFilter {
            search: Some("huawei".to_owned()),
            ..ListFilter::default()
        });
        assert_eq!(view.filtered().len(), 1);
    }

    #[test]
    fn test_device_power_sort() {
        let mut view = ListView::new(devices());
        view.set_sort("current_power_kw", SortDirection::Desc);
        let ids: Vec<&str> = view.filtered().iter().map(|d| d.row_id()).collect();
        assert_eq!(ids, vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn test_alert_severity_sorts_by_rank() {
        let alerts: Vec<Alert> = serde_json::from_value(json!([
            {"id": "a", "severity": "warning"},
            {"id": "b", "severity": "critical"},
            {"id": "c", "severity": "info", "acknowledged": true}
        ]))
        .unwrap();
        let mut view = ListView::new(alerts);
        view.set_sort("severity", SortDirection::Desc);
        let order: Vec<AlertSeverity> = view.filtered().iter().map(|a| a.severity).collect();
        assert_eq!(
            order,
            vec![
                AlertSeverity::Critical,
                AlertSeverity::Warning,
                AlertSeverity::Info
            ]
        );

        view.set_filter(ListFilter {
            status: Some("active".to_owned()),
            ..ListFilter::default()
        });
        assert_eq!(view.filtered().len(), 2);
    }

    #[test]
    fn test_task_due_date_sort_and_priority_filter() {
        let tasks: Vec<MaintenanceTask> = serde_json::from_value(json!([
            {"id": "t1", "priority": "low", "due_date": "2025-09-01"},
            {"id": "t2", "priority": "urgent", "due_date": "2025-03-15"},
            {"id": "t3", "priority": "urgent"}
        ]))
        .unwrap();
        let mut view = ListView::new(tasks);
        view.set_sort("due_date", SortDirection::Asc);
        let ids: Vec<&str> = view.filtered().iter().map(|t| t.row_id()).collect();
        assert_eq!(ids, vec!["t2", "t1", "t3"]);

        view.set_filter(ListFilter {
            kind: Some("urgent".to_owned()),
            ..ListFilter::default()
        });
        assert!(
            view.filtered()
                .iter()
                .all(|t| t.priority == TaskPriority::Urgent)
        );
    }
}
