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

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use pvmon_core::{
    Diagnosis, DiodeParameters, FaultType, IvCurve, SamplePoint, diagnose, render_iv_chart_svg,
    simulate_with_samples,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "iv-curve-tool")]
#[command(about = "Simulate or diagnose photovoltaic module IV curves", long_about = None)]
struct Cli {
    /// Diagnose a measured curve from a CSV file (`voltage,current` columns)
    /// instead of simulating one
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Photocurrent Iph (A)
    #[arg(long, default_value_t = 8.5)]
    iph: f64,

    /// Diode saturation current I0 (A)
    #[arg(long, default_value_t = 1e-9)]
    i0: f64,

    /// Series resistance Rs (ohm)
    #[arg(long, default_value_t = 0.3)]
    rs: f64,

    /// Shunt resistance Rsh (ohm)
    #[arg(long, default_value_t = 300.0)]
    rsh: f64,

    /// Diode ideality factor
    #[arg(short = 'n', long, default_value_t = 1.2)]
    ideality: f64,

    /// Cells in series
    #[arg(long, default_value_t = 60)]
    cells: u32,

    /// Cell temperature (°C)
    #[arg(short, long, default_value_t = 25.0)]
    temperature: f64,

    /// Fault to emulate: none, partial_shading, soiling, degradation,
    /// series_resistance, shunt_resistance, bypass_diode_failure
    #[arg(short, long, default_value = "none")]
    fault: FaultType,

    /// Number of samples from 0 V to the estimated open-circuit voltage
    #[arg(short, long, default_value_t = pvmon_core::iv_curve::DEFAULT_SAMPLE_COUNT)]
    samples: usize,

    /// Write the samples as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write an I-V/P-V chart as SVG
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Chart width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Print curve and diagnosis as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn parameters(&self) -> DiodeParameters {
        DiodeParameters {
            photocurrent_a: self.iph,
            saturation_current_a: self.i0,
            series_resistance_ohm: self.rs,
            shunt_resistance_ohm: self.rsh,
            ideality_factor: self.ideality,
            cell_count: self.cells,
            temperature_c: self.temperature,
        }
    }
}

fn read_curve(path: &Path) -> Result<IvCurve> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut points = Vec::new();
    for (index, record) in reader.deserialize::<SamplePoint>().enumerate() {
        let point = record.with_context(|| format!("Invalid sample on data row {}", index + 1))?;
        points.push(point);
    }
    if points.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    debug!(samples = points.len(), "Read measured curve");
    Ok(IvCurve::from_points(points))
}

fn write_curve(path: &Path, curve: &IvCurve) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["voltage", "current", "power"])?;
    for point in curve.points() {
        writer.write_record([
            format!("{:.4}", point.voltage),
            format!("{:.6}", point.current),
            format!("{:.4}", point.power()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn summary(diagnosis: &Diagnosis) -> String {
    format!(
        "Voc  {:>8.2} V\nIsc  {:>8.3} A\nPmax {:>8.2} W  (Vmp {:.2} V, Imp {:.3} A)\nFF   {:>8.1} %\nStatus: {}, {}",
        diagnosis.voc,
        diagnosis.isc,
        diagnosis.pmax,
        diagnosis.vmp,
        diagnosis.imp,
        diagnosis.fill_factor,
        diagnosis.status,
        diagnosis.finding,
    )
}

fn run(cli: &Cli) -> Result<(IvCurve, Diagnosis)> {
    let curve = match &cli.input {
        Some(path) => read_curve(path)?,
        None => {
            let params = cli.parameters();
            info!(fault = %cli.fault, samples = cli.samples, "Simulating IV curve");
            simulate_with_samples(&params, cli.fault, cli.samples)?
        }
    };
    let diagnosis = diagnose(curve.voltages(), curve.currents())?;
    Ok((curve, diagnosis))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iv_curve_tool=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (curve, diagnosis) = run(&cli)?;

    if let Some(path) = &cli.csv {
        write_curve(path, &curve)?;
        info!(path = %path.display(), "Wrote samples");
    }
    if let Some(path) = &cli.svg {
        let svg = render_iv_chart_svg(&curve, Some(&diagnosis), cli.width, cli.height)
            .map_err(|e| anyhow::anyhow!("Failed to render chart: {e}"))?;
        fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote chart");
    }

    if cli.json {
        let output = serde_json::json!({ "curve": curve, "diagnosis": diagnosis });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", summary(&diagnosis));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_reference_module() {
        let cli = Cli::try_parse_from(["iv-curve-tool"]).expect("parse");
        assert_eq!(cli.parameters(), DiodeParameters::default());
        assert_eq!(cli.fault, FaultType::None);
        assert_eq!(cli.samples, 100);
    }

    #[test]
    fn test_cli_rejects_unknown_fault() {
        assert!(Cli::try_parse_from(["iv-curve-tool", "--fault", "hail"]).is_err());
        let cli = Cli::try_parse_from(["iv-curve-tool", "-f", "partial-shading"]).expect("parse");
        assert_eq!(cli.fault, FaultType::PartialShading);
    }

    #[test]
    fn test_written_curve_reads_back_for_diagnosis() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("curve.csv");
        let cli = Cli::try_parse_from(["iv-curve-tool", "--samples", "20"]).expect("parse");

        let (curve, simulated) = run(&cli).expect("simulate");
        write_curve(&path, &curve).expect("write");

        let measured = Cli::try_parse_from(["iv-curve-tool", "--input", path.to_str().expect("utf8")])
            .expect("parse");
        let (read, diagnosis) = run(&measured).expect("diagnose");
        assert_eq!(read.len(), 20);
        assert_eq!(diagnosis.status, simulated.status);
        assert!((diagnosis.pmax - simulated.pmax).abs() < 0.01);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.csv");
        fs::write(&path, "voltage,current\n").expect("write");
        let err = read_curve(&path).expect_err("no samples");
        assert!(err.to_string().contains("no samples"));
    }

    #[test]
    fn test_summary_mentions_status() {
        let diagnosis = diagnose(&[0.0, 30.0, 36.0], &[8.5, 8.0, 0.0]).expect("diagnose");
        let text = summary(&diagnosis);
        assert!(text.contains("Pmax"));
        assert!(text.contains(diagnosis.status.label()));
    }
}
