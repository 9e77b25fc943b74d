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

pub mod chart;
pub mod diagnosis;
pub mod events;
pub mod export;
pub mod iv_curve;
pub mod listing;
pub mod repair;

pub use chart::render_iv_chart_svg;
pub use diagnosis::{Diagnosis, DiagnosisError, HealthStatus, diagnose};
pub use events::{DashboardEvent, EventBus};
pub use export::{ExportError, UTF8_BOM, export_csv, export_filename};
pub use iv_curve::{
    DiodeParameters, FaultType, IvCurve, SamplePoint, SimulationError, simulate,
    simulate_with_samples,
};
pub use listing::{
    Column, ColumnKind, FieldValue, ListFilter, ListView, Listable, Page, SortDirection, SortState,
};
pub use repair::{RepairError, RepairedList, parse_lenient_list, repair_json};
