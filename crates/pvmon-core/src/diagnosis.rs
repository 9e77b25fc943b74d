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

//! Derived IV-curve metrics and module health classification.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fill factor (%) at or above which a module is considered healthy.
pub const HEALTHY_MIN_FILL_FACTOR: f64 = 65.0;

/// Fill factor (%) below which a module is considered critical.
pub const DEGRADED_MIN_FILL_FACTOR: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    #[must_use]
    pub fn from_fill_factor(fill_factor: f64) -> Self {
        if fill_factor >= HEALTHY_MIN_FILL_FACTOR {
            Self::Healthy
        } else if fill_factor >= DEGRADED_MIN_FILL_FACTOR {
            Self::Degraded
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Degraded => "Degraded",
            Self::Critical => "Critical",
        }
    }

    #[must_use]
    pub fn finding(self) -> &'static str {
        match self {
            Self::Healthy => "Module operating within normal parameters",
            Self::Degraded => "Reduced fill factor: possible shading or soiling",
            Self::Critical => "Severely reduced fill factor: possible cell or junction damage",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    /// Open-circuit voltage, taken as the largest sampled voltage.
    pub voc: f64,
    /// Short-circuit current, taken as the largest sampled current.
    pub isc: f64,
    pub pmax: f64,
    pub vmp: f64,
    pub imp: f64,
    /// Percent, 0 when `voc` or `isc` is zero.
    pub fill_factor: f64,
    pub status: HealthStatus,
    pub finding: &'static str,
}

/// Computes Voc, Isc, the maximum power point and fill factor of a sampled
/// curve and classifies module health.
///
/// Negative samples are clamped to zero, matching simulator output. Empty,
/// mismatched or non-finite input is rejected before anything is computed.
pub fn diagnose(voltages: &[f64], currents: &[f64]) -> Result<Diagnosis, DiagnosisError> {
    if voltages.is_empty() || currents.is_empty() {
        return Err(DiagnosisError::InvalidInput(
            "voltage and current arrays must not be empty".to_owned(),
        ));
    }
    if voltages.len() != currents.len() {
        return Err(DiagnosisError::InvalidInput(format!(
            "array length mismatch: {} voltages, {} currents",
            voltages.len(),
            currents.len()
        )));
    }
    if let Some(index) = voltages
        .iter()
        .zip(currents)
        .position(|(v, i)| !v.is_finite() || !i.is_finite())
    {
        return Err(DiagnosisError::InvalidInput(format!(
            "non-finite sample at index {index}"
        )));
    }

    let mut voc = 0.0_f64;
    let mut isc = 0.0_f64;
    let mut pmax = f64::NEG_INFINITY;
    let mut vmp = 0.0;
    let mut imp = 0.0;

    for (&v, &i) in voltages.iter().zip(currents) {
        let v = v.max(0.0);
        let i = i.max(0.0);
        voc = voc.max(v);
        isc = isc.max(i);
        let p = v * i;
        if p > pmax {
            pmax = p;
            vmp = v;
            imp = i;
        }
    }

    let fill_factor = if voc > 0.0 && isc > 0.0 {
        (pmax / (voc * isc) * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let status = HealthStatus::from_fill_factor(fill_factor);

    Ok(Diagnosis {
        voc,
        isc,
        pmax,
        vmp,
        imp,
        fill_factor,
        status,
        finding: status.finding(),
    })
}
