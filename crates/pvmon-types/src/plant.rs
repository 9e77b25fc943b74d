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

use serde::{Deserialize, Serialize};

use crate::enums::string_enum;
use crate::lenient;

string_enum! {
    pub enum PlantStatus {
        Normal => "normal" | "online" | "ok",
        Warning => "warning" | "degraded",
        Fault => "fault" | "error" | "offline",
        Unknown => "unknown",
    }
    fallback = Unknown;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    #[serde(deserialize_with = "lenient::text", alias = "plant_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "plant_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "address")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number", alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        alias = "lng",
        alias = "lon"
    )]
    pub longitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        alias = "capacity",
        alias = "installed_capacity_kw"
    )]
    pub capacity_kw: Option<f64>,
    #[serde(default)]
    pub status: PlantStatus,
    #[serde(default, deserialize_with = "lenient::opt_count", alias = "devices_count")]
    pub device_count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        alias = "today_energy",
        alias = "daily_energy_kwh"
    )]
    pub today_energy_kwh: Option<f64>,
}

impl Plant {
    /// Display name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Today's yield per installed kW, the usual way to compare plants of
    /// different sizes.
    #[must_use]
    pub fn specific_yield(&self) -> Option<f64> {
        match (self.today_energy_kwh, self.capacity_kw) {
            (Some(energy), Some(capacity)) if capacity > 0.0 => Some(energy / capacity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plant_aliases() {
        let plant: Plant = serde_json::from_value(json!({
            "plant_id": 4,
            "plant_name": "Hodonin",
            "lat": "48.85",
            "lng": 17.13,
            "capacity": 500,
            "status": "Degraded",
            "today_energy": "1250.5"
        }))
        .unwrap();
        assert_eq!(plant.id, "4");
        assert_eq!(plant.display_name(), "Hodonin");
        assert_eq!(plant.latitude, Some(48.85));
        assert_eq!(plant.status, PlantStatus::Warning);
        assert_eq!(plant.specific_yield(), Some(2.501));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<Plant>(json!({"name": "No id"})).is_err());
    }
}
