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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::string_enum;
use crate::lenient;

string_enum! {
    pub enum AlertSeverity {
        Info => "info" | "notice" | "low",
        Warning => "warning" | "medium",
        Critical => "critical" | "high" | "error",
    }
    fallback = Info;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(deserialize_with = "lenient::text", alias = "alert_id")]
    pub id: String,
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
    #[serde(default, alias = "level", alias = "priority")]
    pub severity: AlertSeverity,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        alias = "description",
        alias = "title"
    )]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_timestamp",
        alias = "timestamp",
        alias = "created_at"
    )]
    pub raised_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::lenient_bool", alias = "acked")]
    pub acknowledged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alert_aliases() {
        let alert: Alert = serde_json::from_value(json!({
            "alert_id": 88,
            "plant": "p1",
            "level": "HIGH",
            "description": "Inverter over temperature",
            "timestamp": "2025-07-01 13:00:00",
            "acked": "yes"
        }))
        .unwrap();
        assert_eq!(alert.id, "88");
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert!(alert.acknowledged);
        assert!(alert.raised_at.is_some());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }
}
