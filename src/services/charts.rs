use chrono::{DateTime, Utc};
use plotters::prelude::*;

use crate::models::prediction::PowerPrediction;
use crate::models::telemetry::TelemetrySample;

#[derive(Debug, thiserror::Error)]
#[error("chart rendering failed: {0}")]
pub struct ChartError(String);

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        ChartError(e.to_string())
    }
}

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 300;

const BACKGROUND: RGBColor = RGBColor(255, 255, 255);
const GRID: RGBColor = RGBColor(220, 220, 220);
const LABEL: RGBColor = RGBColor(90, 90, 90);
const BATTERY: RGBColor = RGBColor(75, 192, 192);
const PV: RGBColor = RGBColor(255, 159, 64);
const AC: RGBColor = RGBColor(54, 162, 235);
const TEMPERATURE: RGBColor = RGBColor(255, 99, 132);

/// One named line of a time-series chart.
struct Series<'a> {
    label: &'a str,
    color: RGBColor,
    points: Vec<(DateTime<Utc>, f64)>,
}

fn value_range(series: &[Series<'_>]) -> (f64, f64) {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.1).max(1.0);
    let y_min = if lo >= 0.0 { 0.0 } else { lo - pad };
    (y_min, hi + pad)
}

fn time_range(series: &[Series<'_>]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut times = series.iter().flat_map(|s| s.points.iter().map(|(t, _)| *t));
    let first = times.next()?;
    let (start, end) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if start == end {
        // plotters cannot build a zero-width axis
        return Some((start - chrono::Duration::minutes(30), end + chrono::Duration::minutes(30)));
    }
    Some((start, end))
}

fn render_time_series(caption: &str, y_desc: &str, series: &[Series<'_>]) -> Result<String, ChartError> {
    let mut svg = String::new();
    let Some((start, end)) = time_range(series) else {
        return Ok(svg);
    };
    let (y_min, y_max) = value_range(series);
    let span_hours = (end - start).num_hours();

    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 18, &LABEL))
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(56)
            .build_cartesian_2d(start..end, y_min..y_max)
            .map_err(ChartError::from)?;

        chart
            .configure_mesh()
            .y_desc(y_desc)
            .x_labels(8)
            .y_labels(6)
            .x_label_formatter(&|t| {
                if span_hours > 48 {
                    t.format("%m-%d").to_string()
                } else {
                    t.format("%H:%M").to_string()
                }
            })
            .light_line_style(GRID)
            .label_style(("sans-serif", 11, &LABEL))
            .draw()?;

        for s in series {
            let color = s.color;
            chart
                .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                .label(s.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(BACKGROUND.mix(0.8))
                .border_style(GRID)
                .label_font(("sans-serif", 11, &LABEL))
                .draw()?;
        }

        root.present()?;
    }

    Ok(svg)
}

/// Battery state of charge over time (%).
pub fn battery_chart(samples: &[TelemetrySample]) -> Result<String, ChartError> {
    let points = samples
        .iter()
        .filter_map(|s| s.data.battery_capacity.filter(|v| v.is_finite()).map(|v| (s.timestamp, v)))
        .collect();
    render_time_series(
        "Battery Capacity",
        "Capacity (%)",
        &[Series { label: "Battery Capacity (%)", color: BATTERY, points }],
    )
}

/// PV input and AC output power on one chart (W).
pub fn power_chart(samples: &[TelemetrySample]) -> Result<String, ChartError> {
    let pv = samples
        .iter()
        .filter_map(|s| s.data.pv_input_power.filter(|v| v.is_finite()).map(|v| (s.timestamp, v)))
        .collect::<Vec<_>>();
    let ac = samples
        .iter()
        .filter_map(|s| s.data.ac_output_active_power.filter(|v| v.is_finite()).map(|v| (s.timestamp, v)))
        .collect::<Vec<_>>();
    let series: Vec<_> = [
        Series { label: "PV Input Power (W)", color: PV, points: pv },
        Series { label: "AC Output Power (W)", color: AC, points: ac },
    ]
    .into_iter()
    .filter(|s| !s.points.is_empty())
    .collect();
    render_time_series("Power", "Power (W)", &series)
}

/// Inverter heat-sink temperature over time (°C).
pub fn temperature_chart(samples: &[TelemetrySample]) -> Result<String, ChartError> {
    let points = samples
        .iter()
        .filter_map(|s| {
            s.data
                .inverter_heat_sink_temperature
                .filter(|v| v.is_finite())
                .map(|v| (s.timestamp, v))
        })
        .collect();
    render_time_series(
        "Inverter Temperature",
        "Temperature (°C)",
        &[Series { label: "Temperature (°C)", color: TEMPERATURE, points }],
    )
}

/// Predicted daily power, plotted at noon UTC of each day.
pub fn prediction_chart(predictions: &[PowerPrediction]) -> Result<String, ChartError> {
    let points = predictions
        .iter()
        .filter_map(|p| {
            p.date
                .and_hms_opt(12, 0, 0)
                .map(|noon| (noon.and_utc(), f64::from(p.predicted_power)))
        })
        .collect();
    render_time_series(
        "Predicted Power",
        "Power (W)",
        &[Series { label: "Predicted Power (W)", color: PV, points }],
    )
}
