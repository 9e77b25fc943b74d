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

//! Canonical records shared by the client, core and server crates.
//!
//! Backend payloads are loosely shaped (alias keys, numbers sent as strings,
//! free-form status strings). Everything is normalized here, at the ingestion
//! boundary, so the rest of the workspace only ever sees one typed record.

mod enums;
pub mod lenient;

pub mod alert;
pub mod device;
pub mod maintenance;
pub mod plant;
pub mod scheduler;

pub use alert::{Alert, AlertSeverity};
pub use device::{Device, DeviceKind, DeviceStatus};
pub use maintenance::{MaintenanceTask, TaskPriority, TaskStatus};
pub use plant::{Plant, PlantStatus};
pub use scheduler::{JobState, NewJob, SchedulerJob, SchedulerStatus};
