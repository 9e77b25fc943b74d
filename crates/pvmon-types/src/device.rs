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
use serde_json::Value;

use crate::enums::string_enum;
use crate::lenient::{value_number, value_text, value_timestamp};

string_enum! {
    /// Operational state reported for a field device.
    pub enum DeviceStatus {
        Online => "online" | "running" | "normal" | "ok",
        Offline => "offline" | "disconnected",
        Warning => "warning" | "alarm",
        Fault => "fault" | "error" | "failed",
        Maintenance => "maintenance" | "service",
        Unknown => "unknown",
    }
    fallback = Unknown;
}

string_enum! {
    pub enum DeviceKind {
        Inverter => "inverter",
        Meter => "meter" | "energy_meter",
        WeatherStation => "weather_station" | "weather",
        CombinerBox => "combiner_box" | "combiner",
        Tracker => "tracker",
        Battery => "battery" | "bess",
        Other => "other",
    }
    fallback = Other;
}

/// Canonical device record.
///
/// Deserialization goes through [`RawDevice`], which accepts every key spelling
/// the backend has used; serialization always writes the canonical names below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDevice")]
pub struct Device {
    pub id: String,
    pub serial_number: Option<String>,
    pub name: String,
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    pub plant_id: Option<String>,
    pub plant_name: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub rated_power_kw: Option<f64>,
    pub current_power_kw: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// Output as a fraction of rated power, when both are known.
    #[must_use]
    pub fn load_factor(&self) -> Option<f64> {
        match (self.current_power_kw, self.rated_power_kw) {
            (Some(current), Some(rated)) if rated > 0.0 => Some(current / rated),
            _ => None,
        }
    }
}

/// Wire shape of a device as the backend sends it. Every field is optional
/// and kept as a raw JSON value so that type mismatches never drop a record.
#[derive(Debug, Default, Deserialize)]
struct RawDevice {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    device_id: Value,
    #[serde(default)]
    sn: Value,
    #[serde(default)]
    serial_number: Value,
    #[serde(default, rename = "serialNumber")]
    serial_number_camel: Value,
    #[serde(default)]
    name: Value,
    #[serde(default)]
    device_name: Value,
    #[serde(default)]
    kind: Value,
    #[serde(default, rename = "type")]
    type_: Value,
    #[serde(default)]
    device_type: Value,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    state: Value,
    #[serde(default)]
    plant_id: Value,
    #[serde(default, rename = "plantId")]
    plant_id_camel: Value,
    #[serde(default)]
    plant: Value,
    #[serde(default)]
    plant_name: Value,
    #[serde(default)]
    model: Value,
    #[serde(default)]
    manufacturer: Value,
    #[serde(default)]
    brand: Value,
    #[serde(default)]
    rated_power_kw: Value,
    #[serde(default)]
    rated_power: Value,
    #[serde(default)]
    capacity_kw: Value,
    #[serde(default)]
    current_power_kw: Value,
    #[serde(default)]
    current_power: Value,
    #[serde(default)]
    power_kw: Value,
    #[serde(default)]
    power: Value,
    #[serde(default)]
    last_seen: Value,
    #[serde(default, rename = "lastSeen")]
    last_seen_camel: Value,
    #[serde(default)]
    last_update: Value,
    #[serde(default)]
    updated_at: Value,
}

fn first_text(candidates: &[&Value]) -> Option<String> {
    candidates.iter().find_map(|v| value_text(v))
}

fn first_number(candidates: &[&Value]) -> Option<f64> {
    candidates.iter().find_map(|v| value_number(v))
}

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        let serial_number = first_text(&[&raw.serial_number, &raw.sn, &raw.serial_number_camel]);

        // `plant` is either an id or an embedded `{ id, name }` object
        let (embedded_plant_id, embedded_plant_name) = match &raw.plant {
            Value::Object(obj) => (
                obj.get("id").and_then(value_text),
                obj.get("name").and_then(value_text),
            ),
            other => (value_text(other), None),
        };

        let id = first_text(&[&raw.id, &raw.device_id])
            .or_else(|| serial_number.clone())
            .unwrap_or_default();
        let name = first_text(&[&raw.name, &raw.device_name])
            .or_else(|| serial_number.clone())
            .unwrap_or_else(|| id.clone());

        let kind = first_text(&[&raw.kind, &raw.type_, &raw.device_type])
            .map(|k| DeviceKind::parse_lenient(&k))
            .unwrap_or_default();
        let status = first_text(&[&raw.status, &raw.state])
            .map(|s| DeviceStatus::parse_lenient(&s))
            .unwrap_or_default();

        let last_seen = [
            &raw.last_seen,
            &raw.last_seen_camel,
            &raw.last_update,
            &raw.updated_at,
        ]
        .into_iter()
        .find_map(value_timestamp);

        Self {
            id,
            serial_number,
            name,
            kind,
            status,
            plant_id: first_text(&[&raw.plant_id, &raw.plant_id_camel]).or(embedded_plant_id),
            plant_name: value_text(&raw.plant_name).or(embedded_plant_name),
            model: value_text(&raw.model),
            manufacturer: first_text(&[&raw.manufacturer, &raw.brand]),
            rated_power_kw: first_number(&[&raw.rated_power_kw, &raw.rated_power, &raw.capacity_kw]),
            current_power_kw: first_number(&[
                &raw.current_power_kw,
                &raw.current_power,
                &raw.power_kw,
                &raw.power,
            ]),
            last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_keys_normalize() {
        let device: Device = serde_json::from_value(json!({
            "id": 17,
            "sn": "SN-0017",
            "type": "Inverter",
            "status": "Offline",
            "plantId": 3,
            "power": "4.5",
            "rated_power": 10,
            "lastSeen": "2025-06-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(device.id, "17");
        assert_eq!(device.serial_number.as_deref(), Some("SN-0017"));
        assert_eq!(device.name, "SN-0017");
        assert_eq!(device.kind, DeviceKind::Inverter);
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.plant_id.as_deref(), Some("3"));
        assert_eq!(device.current_power_kw, Some(4.5));
        assert_eq!(device.load_factor(), Some(0.45));
        assert!(device.last_seen.is_some());
    }

    #[test]
    fn test_serial_number_spellings_are_equivalent() {
        let a: Device = serde_json::from_value(json!({"id": "a", "serial_number": "X1"})).unwrap();
        let b: Device = serde_json::from_value(json!({"id": "a", "serialNumber": "X1"})).unwrap();
        let c: Device = serde_json::from_value(json!({"id": "a", "sn": "X1"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_embedded_plant_object() {
        let device: Device = serde_json::from_value(json!({
            "id": "d1",
            "plant": {"id": "p9", "name": "Brno East"}
        }))
        .unwrap();
        assert_eq!(device.plant_id.as_deref(), Some("p9"));
        assert_eq!(device.plant_name.as_deref(), Some("Brno East"));
    }

    #[test]
    fn test_unknown_status_and_kind_fall_back() {
        let device: Device =
            serde_json::from_value(json!({"id": "d2", "status": "sleeping", "kind": "drone"}))
                .unwrap();
        assert_eq!(device.status, DeviceStatus::Unknown);
        assert_eq!(device.kind, DeviceKind::Other);
    }

    #[test]
    fn test_canonical_form_survives_reserialization() {
        let device: Device = serde_json::from_value(json!({
            "device_id": "d3",
            "device_name": "Inverter 3",
            "device_type": "weather station",
            "state": "maintenance",
            "power_kw": 1.25
        }))
        .unwrap();
        let again: Device = serde_json::from_str(&serde_json::to_string(&device).unwrap()).unwrap();
        assert_eq!(device, again);
        assert_eq!(again.kind, DeviceKind::WeatherStation);
        assert_eq!(again.status, DeviceStatus::Maintenance);
    }
}
