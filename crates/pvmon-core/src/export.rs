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

//! CSV export of a filtered and sorted table.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::listing::Listable;

/// Spreadsheet applications need the BOM to detect UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Header row from the column labels, then one row per record, exactly in the
/// order given. Output is UTF-8 prefixed with a BOM.
pub fn export_csv<T: Listable>(rows: &[&T]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(T::columns().iter().map(|c| c.label))?;
        for row in rows {
            writer.write_record(T::columns().iter().map(|c| row.value(c.key).display()))?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

/// e.g. `devices-20250601-1230.csv`
#[must_use]
pub fn export_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}.csv", now.format("%Y%m%d-%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListFilter, ListView, SortDirection};
    use chrono::TimeZone;
    use pvmon_types::Device;
    use serde_json::json;

    fn devices() -> Vec<Device> {
        serde_json::from_value(json!([
            {"id": "1", "name": "Inverter, north", "status": "online", "power": 4.25},
            {"id": "2", "name": "Měřič", "status": "offline"},
            {"id": "3", "name": "Inverter south", "status": "online", "power": 7}
        ]))
        .unwrap()
    }

    #[test]
    fn test_export_has_bom_header_and_filtered_rows() {
        let mut view = ListView::new(devices());
        view.set_filter(ListFilter {
            status: Some("online".to_owned()),
            ..ListFilter::default()
        });
        view.set_sort("current_power_kw", SortDirection::Desc);

        let bytes = export_csv(&view.filtered()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID,Name,Serial number,Type,Status"));
        assert!(lines[1].starts_with("3,Inverter south,"));
        // Embedded comma is quoted
        assert!(lines[2].starts_with("1,\"Inverter, north\","));
        assert!(lines[2].contains(",4.25,"));
    }

    #[test]
    fn test_export_keeps_non_ascii() {
        let rows = devices();
        let refs: Vec<&Device> = rows.iter().collect();
        let bytes = export_csv(&refs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Měřič"));
    }

    #[test]
    fn test_export_of_empty_view_is_header_only() {
        let bytes = export_csv::<Device>(&[]).unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_export_filename() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(export_filename("devices", now), "devices-20250601-1230.csv");
    }
}
