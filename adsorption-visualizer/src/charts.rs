//! Time-series charts: adsorbed molecules and resistance against time.

use adsorption_common::TimeSeriesSample;
use anyhow::Result;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use std::path::Path;

/// Appearance of a single-series line chart.
#[derive(Clone)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub line_color: RGBColor,
    /// Radius of the circle drawn at each sample.
    pub marker_size: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            title: String::new(),
            xlabel: "Time (s)".to_string(),
            ylabel: String::new(),
            line_color: BLUE,
            marker_size: 4,
        }
    }
}

impl ChartConfig {
    pub fn adsorption() -> Self {
        Self {
            title: "Total Adsorbed Molecules vs Time".to_string(),
            ylabel: "Adsorbed Molecules".to_string(),
            ..Self::default()
        }
    }

    pub fn resistance() -> Self {
        Self {
            title: "Resistance vs Time".to_string(),
            ylabel: "Resistance (Ohms)".to_string(),
            line_color: RGBColor(0, 128, 0),
            ..Self::default()
        }
    }
}

/// (time, adsorbed count) pairs.
pub fn adsorption_points(samples: &[TimeSeriesSample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|s| (s.time_s as f64, s.total_adsorbed as f64))
        .collect()
}

/// (time, resistance) pairs.
pub fn resistance_points(samples: &[TimeSeriesSample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|s| (s.time_s as f64, s.resistance_ohm))
        .collect()
}

/// Axis range covering `values` with 10% padding. A flat series gets a band
/// around its value so the line stays visible.
pub fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span > 0.0 {
        (min - 0.1 * span, max + 0.1 * span)
    } else {
        let pad = if min != 0.0 { 0.1 * min.abs() } else { 1.0 };
        (min - pad, max + pad)
    }
}

/// Draws a line chart with circle markers to a PNG file.
pub fn plot_series(points: &[(f64, f64)], output_path: &Path, config: &ChartConfig) -> Result<()> {
    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_time = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(&root)
        .caption(&config.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..max_time, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(&config.xlabel)
        .y_desc(&config.ylabel)
        .y_label_formatter(&|v| format!("{:.3e}", v))
        .draw()?;

    let color = config.line_color;
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, config.marker_size, color.filled())),
    )?;

    root.present()?;
    Ok(())
}
