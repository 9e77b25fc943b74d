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

//! Single-diode photovoltaic IV-curve synthesis.
//!
//! The module current at terminal voltage `V` follows
//!
//! ```text
//! I = Iph - I0 * (exp(V / (n * Vt * Ns)) - 1) - V / Rsh
//! ```
//!
//! with `Vt = kT/q`. Voltages are sampled evenly from 0 to an estimated
//! open-circuit voltage of `Ns * 0.6 V`. Series resistance only enters the
//! model through the `SeriesResistance` fault, which switches to the implicit
//! form and solves it per sample with Newton's method.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Elementary charge in C.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

pub const DEFAULT_SAMPLE_COUNT: usize = 100;

const ZERO_CELSIUS_K: f64 = 273.15;

/// Open-circuit voltage heuristic for crystalline silicon cells.
const VOC_PER_CELL_V: f64 = 0.6;

const SOILING_PHOTOCURRENT_FACTOR: f64 = 0.85;
const SHUNT_FAULT_FACTOR: f64 = 0.2;
const SERIES_FAULT_FACTOR: f64 = 5.0;
const DEGRADATION_PHOTOCURRENT_FACTOR: f64 = 0.90;
const DEGRADATION_SATURATION_FACTOR: f64 = 10.0;
/// Shaded substring only conducts below this fraction of the estimated Voc.
const SHADING_VOLTAGE_FRACTION: f64 = 0.7;
const SHADING_CURRENT_FACTOR: f64 = 0.5;
/// A failed bypass diode takes one of the three cell substrings out.
const BYPASS_ACTIVE_FRACTION: f64 = 2.0 / 3.0;

const NEWTON_MAX_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE_A: f64 = 1e-10;
/// Keeps `exp` finite for absurd inputs; exp(700) is still representable.
const MAX_EXPONENT: f64 = 700.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("temperature {0} °C is at or below absolute zero")]
    Temperature(f64),

    #[error("sample count must be at least 2, got {0}")]
    SampleCount(usize),
}

/// Deviation applied to the healthy module model before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    #[default]
    None,
    PartialShading,
    Soiling,
    Degradation,
    SeriesResistance,
    ShuntResistance,
    BypassDiodeFailure,
}

impl FaultType {
    pub const ALL: &'static [FaultType] = &[
        Self::None,
        Self::PartialShading,
        Self::Soiling,
        Self::Degradation,
        Self::SeriesResistance,
        Self::ShuntResistance,
        Self::BypassDiodeFailure,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PartialShading => "partial_shading",
            Self::Soiling => "soiling",
            Self::Degradation => "degradation",
            Self::SeriesResistance => "series_resistance",
            Self::ShuntResistance => "shunt_resistance",
            Self::BypassDiodeFailure => "bypass_diode_failure",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "No fault",
            Self::PartialShading => "Partial shading",
            Self::Soiling => "Soiling",
            Self::Degradation => "Degradation",
            Self::SeriesResistance => "High series resistance",
            Self::ShuntResistance => "Low shunt resistance",
            Self::BypassDiodeFailure => "Bypass diode failure",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown fault type: '{s}'. Supported: {}",
                    Self::ALL
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Single-diode model parameters of one module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiodeParameters {
    #[serde(alias = "iph")]
    pub photocurrent_a: f64,
    #[serde(alias = "i0")]
    pub saturation_current_a: f64,
    #[serde(alias = "rs")]
    pub series_resistance_ohm: f64,
    #[serde(alias = "rsh")]
    pub shunt_resistance_ohm: f64,
    #[serde(alias = "n")]
    pub ideality_factor: f64,
    #[serde(alias = "cellCount")]
    pub cell_count: u32,
    #[serde(alias = "temperature")]
    pub temperature_c: f64,
}

impl Default for DiodeParameters {
    /// A typical 60-cell module at 25 °C.
    fn default() -> Self {
        Self {
            photocurrent_a: 8.5,
            saturation_current_a: 1e-9,
            series_resistance_ohm: 0.3,
            shunt_resistance_ohm: 300.0,
            ideality_factor: 1.2,
            cell_count: 60,
            temperature_c: 25.0,
        }
    }
}

impl DiodeParameters {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let positive = [
            ("photocurrent", self.photocurrent_a),
            ("saturation current", self.saturation_current_a),
            ("series resistance", self.series_resistance_ohm),
            ("shunt resistance", self.shunt_resistance_ohm),
            ("ideality factor", self.ideality_factor),
            ("cell count", f64::from(self.cell_count)),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::InvalidParameter { name, value });
            }
        }
        if !self.temperature_c.is_finite() || self.temperature_c + ZERO_CELSIUS_K <= 0.0 {
            return Err(SimulationError::Temperature(self.temperature_c));
        }
        if !(1.0..=2.0).contains(&self.ideality_factor) {
            warn!(
                ideality_factor = self.ideality_factor,
                "Ideality factor outside the usual 1..2 range"
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn temperature_k(&self) -> f64 {
        self.temperature_c + ZERO_CELSIUS_K
    }

    /// Thermal voltage `kT/q` in volts.
    #[must_use]
    pub fn thermal_voltage(&self) -> f64 {
        BOLTZMANN * self.temperature_k() / ELEMENTARY_CHARGE
    }

    /// Upper end of the voltage sweep.
    #[must_use]
    pub fn estimated_voc(&self) -> f64 {
        f64::from(self.cell_count) * VOC_PER_CELL_V
    }
}

/// Parameters after the fault perturbation, ready for evaluation.
#[derive(Debug, Clone, Copy)]
struct ModuleModel {
    iph: f64,
    i0: f64,
    rs: f64,
    rsh: f64,
    /// `n * Vt * Ns`, the diode exponent denominator.
    diode_scale: f64,
}

impl ModuleModel {
    fn new(params: &DiodeParameters, fault: FaultType) -> Self {
        let mut iph = params.photocurrent_a;
        let mut i0 = params.saturation_current_a;
        let mut rs = params.series_resistance_ohm;
        let mut rsh = params.shunt_resistance_ohm;
        let mut cells = f64::from(params.cell_count);

        match fault {
            FaultType::None | FaultType::PartialShading => {}
            FaultType::Soiling => iph *= SOILING_PHOTOCURRENT_FACTOR,
            FaultType::Degradation => {
                iph *= DEGRADATION_PHOTOCURRENT_FACTOR;
                i0 *= DEGRADATION_SATURATION_FACTOR;
            }
            FaultType::SeriesResistance => rs *= SERIES_FAULT_FACTOR,
            FaultType::ShuntResistance => rsh *= SHUNT_FAULT_FACTOR,
            FaultType::BypassDiodeFailure => cells *= BYPASS_ACTIVE_FRACTION,
        }

        Self {
            iph,
            i0,
            rs,
            rsh,
            diode_scale: params.ideality_factor * params.thermal_voltage() * cells,
        }
    }

    fn diode_exp(&self, junction_v: f64) -> f64 {
        (junction_v / self.diode_scale).min(MAX_EXPONENT).exp()
    }

    /// Closed form, series resistance neglected.
    fn explicit_current(&self, voltage: f64) -> f64 {
        self.iph - self.i0 * (self.diode_exp(voltage) - 1.0) - voltage / self.rsh
    }

    /// Solves `I = Iph - I0(exp((V + I Rs)/a) - 1) - (V + I Rs)/Rsh` for `I`.
    ///
    /// The residual is concave and decreasing in `I`, so Newton started at
    /// `Iph` (always at or right of the root for `V >= 0`) converges
    /// monotonically without overshoot.
    fn implicit_current(&self, voltage: f64) -> f64 {
        let mut current = self.iph;
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let junction_v = voltage + current * self.rs;
            let exp_term = self.diode_exp(junction_v);
            let residual =
                self.iph - self.i0 * (exp_term - 1.0) - junction_v / self.rsh - current;
            let slope = -self.i0 * self.rs / self.diode_scale * exp_term - self.rs / self.rsh - 1.0;
            let step = residual / slope;
            current -= step;
            if step.abs() < NEWTON_TOLERANCE_A {
                break;
            }
        }
        current
    }
}

/// One `(voltage, current)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub voltage: f64,
    pub current: f64,
}

impl SamplePoint {
    #[must_use]
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

/// Sampled IV curve. Voltage and current columns always have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IvCurve {
    voltages: Vec<f64>,
    currents: Vec<f64>,
}

impl IvCurve {
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = SamplePoint>) -> Self {
        let (voltages, currents) = points.into_iter().map(|p| (p.voltage, p.current)).unzip();
        Self { voltages, currents }
    }

    #[must_use]
    pub fn voltages(&self) -> &[f64] {
        &self.voltages
    }

    #[must_use]
    pub fn currents(&self) -> &[f64] {
        &self.currents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.voltages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voltages.is_empty()
    }

    /// Iterates the samples; can be called any number of times.
    pub fn points(&self) -> impl Iterator<Item = SamplePoint> + '_ {
        self.voltages
            .iter()
            .zip(&self.currents)
            .map(|(&voltage, &current)| SamplePoint { voltage, current })
    }
}

/// Synthesizes a curve with [`DEFAULT_SAMPLE_COUNT`] samples.
pub fn simulate(params: &DiodeParameters, fault: FaultType) -> Result<IvCurve, SimulationError> {
    simulate_with_samples(params, fault, DEFAULT_SAMPLE_COUNT)
}

pub fn simulate_with_samples(
    params: &DiodeParameters,
    fault: FaultType,
    sample_count: usize,
) -> Result<IvCurve, SimulationError> {
    if sample_count < 2 {
        return Err(SimulationError::SampleCount(sample_count));
    }
    params.validate()?;

    let model = ModuleModel::new(params, fault);
    let voc_estimate = params.estimated_voc();
    let shading_knee = voc_estimate * SHADING_VOLTAGE_FRACTION;

    #[expect(
        clippy::cast_precision_loss,
        reason = "sample counts are tiny compared to the f64 mantissa"
    )]
    let step = voc_estimate / (sample_count - 1) as f64;

    let points = (0..sample_count).map(|i| {
        #[expect(clippy::cast_precision_loss, reason = "see step")]
        let voltage = step * i as f64;
        let mut current = match fault {
            FaultType::SeriesResistance => model.implicit_current(voltage),
            FaultType::None
            | FaultType::PartialShading
            | FaultType::Soiling
            | FaultType::Degradation
            | FaultType::ShuntResistance
            | FaultType::BypassDiodeFailure => model.explicit_current(voltage),
        };
        if fault == FaultType::PartialShading && voltage < shading_knee {
            current *= SHADING_CURRENT_FACTOR;
        }
        let current = if current.is_finite() { current.max(0.0) } else { 0.0 };
        SamplePoint { voltage, current }
    });

    let curve = IvCurve::from_points(points);
    debug!(
        fault = %fault,
        samples = curve.len(),
        voc_estimate,
        "Simulated IV curve"
    );
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DiodeParameters {
        DiodeParameters::default()
    }

    #[test]
    fn test_sample_count_and_non_negative_currents() {
        for &fault in FaultType::ALL {
            let curve = simulate(&reference(), fault).unwrap();
            assert_eq!(curve.len(), DEFAULT_SAMPLE_COUNT, "fault {fault}");
            assert_eq!(curve.voltages().len(), curve.currents().len());
            assert!(
                curve.currents().iter().all(|&i| i >= 0.0 && i.is_finite()),
                "fault {fault}"
            );
        }
    }

    #[test]
    fn test_reference_module_endpoints() {
        let curve = simulate(&reference(), FaultType::None).unwrap();
        let first = curve.points().next().unwrap();
        let last = curve.points().last().unwrap();

        assert_eq!(first.voltage, 0.0);
        assert!((first.current - 8.5).abs() < 1e-9);
        assert!((last.voltage - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_without_fault() {
        let a = simulate(&reference(), FaultType::None).unwrap();
        let b = simulate(&reference(), FaultType::None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_points_are_restartable() {
        let curve = simulate(&reference(), FaultType::Soiling).unwrap();
        assert_eq!(curve.points().count(), curve.points().count());
    }

    #[test]
    fn test_soiling_scales_short_circuit_current() {
        let curve = simulate(&reference(), FaultType::Soiling).unwrap();
        assert!((curve.currents()[0] - 8.5 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_partial_shading_halves_low_voltage_region() {
        let healthy = simulate(&reference(), FaultType::None).unwrap();
        let shaded = simulate(&reference(), FaultType::PartialShading).unwrap();
        let knee = 36.0 * 0.7;
        for ((v, h), s) in healthy
            .voltages()
            .iter()
            .zip(healthy.currents())
            .zip(shaded.currents())
        {
            if *v < knee {
                assert!((s - h * 0.5).abs() < 1e-12);
            } else {
                assert!((s - h).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_shunt_fault_steepens_slope() {
        let healthy = simulate(&reference(), FaultType::None).unwrap();
        let leaky = simulate(&reference(), FaultType::ShuntResistance).unwrap();
        // Leakage V/Rsh grows five-fold, so mid-curve current drops
        assert!(leaky.currents()[50] < healthy.currents()[50]);
    }

    #[test]
    fn test_series_fault_solves_implicit_equation() {
        let params = reference();
        let curve = simulate(&params, FaultType::SeriesResistance).unwrap();
        let rs = params.series_resistance_ohm * 5.0;
        let a = params.ideality_factor * params.thermal_voltage() * 60.0;

        for p in curve.points().filter(|p| p.current > 0.0) {
            let junction = p.voltage + p.current * rs;
            let rhs = params.photocurrent_a
                - params.saturation_current_a * ((junction / a).exp() - 1.0)
                - junction / params.shunt_resistance_ohm;
            assert!((rhs - p.current).abs() < 1e-6, "residual at {} V", p.voltage);
        }
    }

    #[test]
    fn test_bypass_failure_collapses_upper_third() {
        let curve = simulate(&reference(), FaultType::BypassDiodeFailure).unwrap();
        let last = curve.points().last().unwrap();
        assert_eq!(last.current, 0.0);
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        let params = DiodeParameters {
            shunt_resistance_ohm: 0.0,
            ..reference()
        };
        assert!(matches!(
            simulate(&params, FaultType::None),
            Err(SimulationError::InvalidParameter {
                name: "shunt resistance",
                ..
            })
        ));

        let params = DiodeParameters {
            cell_count: 0,
            ..reference()
        };
        assert!(simulate(&params, FaultType::None).is_err());

        let params = DiodeParameters {
            temperature_c: -300.0,
            ..reference()
        };
        assert_eq!(
            simulate(&params, FaultType::None),
            Err(SimulationError::Temperature(-300.0))
        );
    }

    #[test]
    fn test_sample_count_lower_bound() {
        assert_eq!(
            simulate_with_samples(&reference(), FaultType::None, 1),
            Err(SimulationError::SampleCount(1))
        );
        let curve = simulate_with_samples(&reference(), FaultType::None, 2).unwrap();
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn test_fault_type_parsing() {
        assert_eq!("partial-shading".parse::<FaultType>(), Ok(FaultType::PartialShading));
        assert_eq!(
            "Bypass Diode Failure".parse::<FaultType>(),
            Ok(FaultType::BypassDiodeFailure)
        );
        assert!("lightning".parse::<FaultType>().is_err());
    }

    #[test]
    fn test_parameters_accept_short_keys() {
        let params: DiodeParameters = serde_json::from_str(
            r#"{"iph": 9.0, "i0": 2e-9, "rs": 0.2, "rsh": 250, "n": 1.3, "cellCount": 72, "temperature": 40}"#,
        )
        .unwrap();
        assert_eq!(params.cell_count, 72);
        assert!((params.estimated_voc() - 43.2).abs() < 1e-9);
    }
}
