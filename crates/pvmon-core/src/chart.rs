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

use crate::diagnosis::Diagnosis;
use crate::iv_curve::IvCurve;
use plotters::prelude::*;

const BACKGROUND: RGBColor = RGBColor(26, 26, 26);
const CURRENT_COLOR: RGBColor = RGBColor(33, 150, 243);
const POWER_COLOR: RGBColor = RGBColor(255, 152, 0);
const MPP_COLOR: RGBColor = RGBColor(76, 175, 80);
const LABEL_COLOR: RGBColor = RGBColor(153, 153, 153);

/// Upper axis bound with 10% headroom; never an empty range.
fn axis_max(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value * 1.1
    } else {
        1.0
    }
}

/// Render the I-V curve (left axis) and P-V curve (right axis) as SVG.
///
/// The maximum power point is marked; when a diagnosis is supplied its fill
/// factor and health status go into the caption.
///
/// # Errors
/// Returns error if chart generation fails
pub fn render_iv_chart_svg(
    curve: &IvCurve,
    diagnosis: Option<&Diagnosis>,
    width: u32,
    height: u32,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut svg_data = String::new();

    if curve.is_empty() {
        return Ok(svg_data);
    }

    let v_max = curve.voltages().iter().copied().fold(0.0_f64, f64::max);
    let i_max = curve.currents().iter().copied().fold(0.0_f64, f64::max);
    let mpp = curve
        .points()
        .max_by(|a, b| a.power().total_cmp(&b.power()));
    let p_max = mpp.map_or(0.0, |p| p.power());

    let caption = match diagnosis {
        Some(d) => format!(
            "I-V Curve: FF {:.1}% ({}), Pmax {:.1} W",
            d.fill_factor, d.status, d.pmax
        ),
        None => format!("I-V Curve: Pmax {p_max:.1} W"),
    };

    {
        let root = SVGBackend::with_string(&mut svg_data, (width, height)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&caption, ("sans-serif", 18, &WHITE))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .right_y_label_area_size(60)
            .build_cartesian_2d(0.0..axis_max(v_max), 0.0..axis_max(i_max))?
            .set_secondary_coord(0.0..axis_max(v_max), 0.0..axis_max(p_max));

        chart
            .configure_mesh()
            .x_desc("Voltage (V)")
            .y_desc("Current (A)")
            .label_style(("sans-serif", 12, &LABEL_COLOR))
            .axis_style(RGBColor(58, 58, 58))
            .light_line_style(RGBColor(40, 40, 40))
            .draw()?;

        chart
            .configure_secondary_axes()
            .y_desc("Power (W)")
            .label_style(("sans-serif", 12, &LABEL_COLOR))
            .axis_style(RGBColor(58, 58, 58))
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                curve.points().map(|p| (p.voltage, p.current)),
                CURRENT_COLOR.stroke_width(2),
            ))?
            .label("Current")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 16, y)], CURRENT_COLOR));

        chart
            .draw_secondary_series(LineSeries::new(
                curve.points().map(|p| (p.voltage, p.power())),
                POWER_COLOR.stroke_width(2),
            ))?
            .label("Power")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 16, y)], POWER_COLOR));

        if let Some(point) = mpp {
            chart
                .draw_secondary_series(std::iter::once(Circle::new(
                    (point.voltage, point.power()),
                    5,
                    MPP_COLOR.filled(),
                )))?
                .label("MPP")
                .legend(|(x, y)| Circle::new((x + 8, y), 4, MPP_COLOR.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", 12, &LABEL_COLOR))
            .background_style(BACKGROUND.mix(0.8))
            .border_style(RGBColor(58, 58, 58))
            .draw()?;

        root.present()?;
    }

    Ok(svg_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::diagnose;
    use crate::iv_curve::{DiodeParameters, FaultType, simulate};

    #[test]
    fn test_empty_curve_renders_nothing() {
        let curve = IvCurve::from_points(Vec::new());
        let svg = render_iv_chart_svg(&curve, None, 640, 400).unwrap();
        assert!(svg.is_empty());
    }

    #[test]
    fn test_chart_contains_caption() {
        let curve = simulate(&DiodeParameters::default(), FaultType::None).unwrap();
        let diagnosis = diagnose(curve.voltages(), curve.currents()).unwrap();
        let svg = render_iv_chart_svg(&curve, Some(&diagnosis), 800, 480).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("I-V Curve: FF"));
        assert!(svg.contains("Voltage (V)"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn test_flat_curve_does_not_fail() {
        let curve = IvCurve::from_points(
            [0.0, 1.0, 2.0].map(|voltage| crate::iv_curve::SamplePoint {
                voltage,
                current: 0.0,
            }),
        );
        let svg = render_iv_chart_svg(&curve, None, 320, 200).unwrap();
        assert!(svg.contains("Pmax 0.0 W"));
    }
}
