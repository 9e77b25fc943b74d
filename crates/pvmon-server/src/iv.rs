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

//! IV-curve simulation and diagnosis: the interactive page and its JSON API.

use std::str::FromStr;

use askama::Template;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pvmon_core::{
    Diagnosis, DiodeParameters, FaultType, IvCurve, diagnose, render_iv_chart_svg,
    simulate_with_samples,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::api::ApiError;
use crate::pages::{Fact, Layout, render};
use crate::state::AppState;
use crate::table::FilterOption;

/// Upper bound for a requested sample count.
pub const MAX_SAMPLES: usize = 10_000;

/// Simulates and diagnoses in one go.
fn run(
    params: &DiodeParameters,
    fault: FaultType,
    samples: usize,
) -> Result<(IvCurve, Diagnosis), String> {
    if samples > MAX_SAMPLES {
        return Err(format!("sample count must be at most {MAX_SAMPLES}, got {samples}"));
    }
    let curve = simulate_with_samples(params, fault, samples).map_err(|e| e.to_string())?;
    let diagnosis = diagnose(curve.voltages(), curve.currents()).map_err(|e| e.to_string())?;
    debug!(
        fault = fault.as_str(),
        samples,
        pmax = diagnosis.pmax,
        fill_factor = diagnosis.fill_factor,
        "Simulated IV curve"
    );
    Ok((curve, diagnosis))
}

/// Page and chart parameters. Every value arrives as text so that a bad
/// field can be reported next to the form instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IvQuery {
    #[serde(default)]
    pub iph: Option<String>,
    #[serde(default)]
    pub i0: Option<String>,
    #[serde(default)]
    pub rs: Option<String>,
    #[serde(default)]
    pub rsh: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub cells: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub fault: Option<String>,
    #[serde(default)]
    pub samples: Option<String>,
}

/// Blank means "use the default".
fn field<T: FromStr>(raw: Option<&String>, label: &str, default: T) -> Result<T, String> {
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| format!("Invalid value for {label}: '{value}'")),
    }
}

impl IvQuery {
    fn parse(&self) -> Result<(DiodeParameters, FaultType, usize), String> {
        let defaults = DiodeParameters::default();
        let params = DiodeParameters {
            photocurrent_a: field(self.iph.as_ref(), "photocurrent", defaults.photocurrent_a)?,
            saturation_current_a: field(
                self.i0.as_ref(),
                "saturation current",
                defaults.saturation_current_a,
            )?,
            series_resistance_ohm: field(
                self.rs.as_ref(),
                "series resistance",
                defaults.series_resistance_ohm,
            )?,
            shunt_resistance_ohm: field(
                self.rsh.as_ref(),
                "shunt resistance",
                defaults.shunt_resistance_ohm,
            )?,
            ideality_factor: field(self.n.as_ref(), "ideality factor", defaults.ideality_factor)?,
            cell_count: field(self.cells.as_ref(), "cell count", defaults.cell_count)?,
            temperature_c: field(self.temperature.as_ref(), "temperature", defaults.temperature_c)?,
        };
        let fault = field(self.fault.as_ref(), "fault", FaultType::None)?;
        let samples = field(
            self.samples.as_ref(),
            "samples",
            pvmon_core::iv_curve::DEFAULT_SAMPLE_COUNT,
        )?;
        Ok((params, fault, samples))
    }

    /// Same parameters as a query string for the chart link.
    fn chart_href(&self) -> String {
        let pairs: Vec<String> = [
            ("iph", &self.iph),
            ("i0", &self.i0),
            ("rs", &self.rs),
            ("rsh", &self.rsh),
            ("n", &self.n),
            ("cells", &self.cells),
            ("temperature", &self.temperature),
            ("fault", &self.fault),
            ("samples", &self.samples),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| format!("{key}={}", urlencoding::encode(v.trim())))
        })
        .collect();
        if pairs.is_empty() {
            CHART_PATH.to_owned()
        } else {
            format!("{CHART_PATH}?{}", pairs.join("&"))
        }
    }
}

const CHART_PATH: &str = "/api/iv-curve/chart.svg";

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Template)]
#[template(path = "iv_curve.html")]
struct IvCurveTemplate {
    layout: Layout,
    error: String,
    fields: Vec<FormField>,
    faults: Vec<FilterOption>,
    chart_svg: String,
    chart_href: String,
    status_label: &'static str,
    status_class: String,
    finding: &'static str,
    results: Vec<Fact>,
}

fn form_fields(query: &IvQuery) -> Vec<FormField> {
    let defaults = DiodeParameters::default();
    let value = |raw: &Option<String>, default: String| {
        raw.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or(default, ToOwned::to_owned)
    };
    vec![
        FormField {
            name: "iph",
            label: "Photocurrent Iph (A)",
            value: value(&query.iph, defaults.photocurrent_a.to_string()),
        },
        FormField {
            name: "i0",
            label: "Saturation current I0 (A)",
            value: value(&query.i0, format!("{:e}", defaults.saturation_current_a)),
        },
        FormField {
            name: "rs",
            label: "Series resistance Rs (Ω)",
            value: value(&query.rs, defaults.series_resistance_ohm.to_string()),
        },
        FormField {
            name: "rsh",
            label: "Shunt resistance Rsh (Ω)",
            value: value(&query.rsh, defaults.shunt_resistance_ohm.to_string()),
        },
        FormField {
            name: "n",
            label: "Ideality factor n",
            value: value(&query.n, defaults.ideality_factor.to_string()),
        },
        FormField {
            name: "cells",
            label: "Cells in series",
            value: value(&query.cells, defaults.cell_count.to_string()),
        },
        FormField {
            name: "temperature",
            label: "Cell temperature (°C)",
            value: value(&query.temperature, defaults.temperature_c.to_string()),
        },
        FormField {
            name: "samples",
            label: "Samples",
            value: value(
                &query.samples,
                pvmon_core::iv_curve::DEFAULT_SAMPLE_COUNT.to_string(),
            ),
        },
    ]
}

fn diagnosis_facts(diagnosis: &Diagnosis) -> Vec<Fact> {
    vec![
        Fact {
            label: "Open-circuit voltage Voc",
            value: format!("{:.2} V", diagnosis.voc),
        },
        Fact {
            label: "Short-circuit current Isc",
            value: format!("{:.2} A", diagnosis.isc),
        },
        Fact {
            label: "Maximum power Pmax",
            value: format!("{:.1} W", diagnosis.pmax),
        },
        Fact {
            label: "Vmp",
            value: format!("{:.2} V", diagnosis.vmp),
        },
        Fact {
            label: "Imp",
            value: format!("{:.2} A", diagnosis.imp),
        },
        Fact {
            label: "Fill factor",
            value: format!("{:.1} %", diagnosis.fill_factor),
        },
    ]
}

/// `/diagnostics/iv-curve`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn page(State(state): State<AppState>, Query(query): Query<IvQuery>) -> Response {
    let selected_fault = query
        .fault
        .as_deref()
        .and_then(|f| FaultType::from_str(f).ok())
        .unwrap_or_default();
    let mut template = IvCurveTemplate {
        layout: Layout::new("IV diagnostics", "diagnostics"),
        error: String::new(),
        fields: form_fields(&query),
        faults: FaultType::ALL
            .iter()
            .map(|f| FilterOption {
                value: f.as_str().to_owned(),
                label: f.label().to_owned(),
                selected: *f == selected_fault,
            })
            .collect(),
        chart_svg: String::new(),
        chart_href: query.chart_href(),
        status_label: "",
        status_class: String::new(),
        finding: "",
        results: Vec::new(),
    };

    let outcome = query
        .parse()
        .and_then(|(params, fault, samples)| run(&params, fault, samples));
    let status = match outcome {
        Ok((curve, diagnosis)) => {
            let ui = &state.config.ui;
            match render_iv_chart_svg(&curve, Some(&diagnosis), ui.chart_width, ui.chart_height) {
                Ok(svg) => template.chart_svg = svg,
                Err(e) => error!(error = %e, "Failed to render IV chart"),
            }
            template.status_label = diagnosis.status.label();
            template.status_class = diagnosis.status.label().to_lowercase();
            template.finding = diagnosis.finding;
            template.results = diagnosis_facts(&diagnosis);
            StatusCode::OK
        }
        Err(message) => {
            template.error = message;
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    render(&template, status)
}

/// Body of `POST /api/iv-curve/simulate`. Parameter keys accept both long
/// names (`photocurrent_a`) and the short symbols (`iph`).
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    #[serde(flatten)]
    pub parameters: DiodeParameters,
    #[serde(default, alias = "faultType", alias = "fault_type")]
    pub fault: FaultType,
    #[serde(default)]
    pub samples: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub parameters: DiodeParameters,
    pub fault: FaultType,
    pub curve: IvCurve,
    pub diagnosis: Diagnosis,
}

/// `POST /api/iv-curve/simulate`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn simulate_api(
    Json(request): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let samples = request
        .samples
        .unwrap_or(pvmon_core::iv_curve::DEFAULT_SAMPLE_COUNT);
    let (curve, diagnosis) =
        run(&request.parameters, request.fault, samples).map_err(ApiError::unprocessable)?;
    Ok(Json(SimulateResponse {
        parameters: request.parameters,
        fault: request.fault,
        curve,
        diagnosis,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnoseRequest {
    pub voltages: Vec<f64>,
    pub currents: Vec<f64>,
}

/// `POST /api/iv-curve/diagnose`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn diagnose_api(
    Json(request): Json<DiagnoseRequest>,
) -> Result<Json<Diagnosis>, ApiError> {
    diagnose(&request.voltages, &request.currents)
        .map(Json)
        .map_err(|e| ApiError::unprocessable(e.to_string()))
}

/// `GET /api/iv-curve/chart.svg`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn chart_svg(
    State(state): State<AppState>,
    Query(query): Query<IvQuery>,
) -> Result<Response, ApiError> {
    let (params, fault, samples) = query.parse().map_err(ApiError::unprocessable)?;
    let (curve, diagnosis) = run(&params, fault, samples).map_err(ApiError::unprocessable)?;
    let ui = &state.config.ui;
    let svg = render_iv_chart_svg(&curve, Some(&diagnosis), ui.chart_width, ui.chart_height)
        .map_err(|e| {
            error!(error = %e, "Failed to render IV chart");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"))],
        svg,
    )
        .into_response())
}
