use askama::Template;
use chrono::{DateTime, TimeZone};

use crate::models::range::ReportRange;
use crate::models::stats::AggregatedStats;
use crate::models::telemetry::TelemetrySample;
use crate::services::charts::{self, ChartError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("report template failed: {0}")]
    Template(#[from] askama::Error),
}

struct Row {
    label: &'static str,
    value: String,
}

struct Section {
    heading: &'static str,
    /// Inline SVG; empty when the window had nothing to plot.
    chart: String,
    rows: Vec<Row>,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    period: &'static str,
    sample_count: usize,
    window_start: String,
    window_end: String,
    generated_at: String,
    sections: Vec<Section>,
    health: Vec<Row>,
}

fn row(label: &'static str, value: String) -> Row {
    Row { label, value }
}

/// Everything the report needs from one aggregation window.
pub struct ReportInput<'a, Tz: TimeZone> {
    pub range: ReportRange,
    pub window: (DateTime<Tz>, DateTime<Tz>),
    pub generated_at: DateTime<Tz>,
    pub stats: &'a AggregatedStats,
    pub samples: &'a [TelemetrySample],
}

pub fn render_report<Tz: TimeZone>(input: ReportInput<'_, Tz>) -> Result<String, ReportError>
where
    Tz::Offset: std::fmt::Display,
{
    let ReportInput { range, window, generated_at, stats, samples } = input;
    let b = &stats.battery;
    let p = &stats.power;
    let t = &stats.temperature;

    let sections = vec![
        Section {
            heading: "Battery Statistics",
            chart: charts::battery_chart(samples)?,
            rows: vec![
                row("Average Battery Capacity", format!("{:.1}%", b.avg_capacity)),
                row("Minimum Battery Capacity", format!("{:.1}%", b.min_capacity)),
                row("Maximum Battery Capacity", format!("{:.1}%", b.max_capacity)),
                row("Average Battery Voltage", format!("{:.1}V", b.avg_voltage)),
                row("Total Charging Time", format!("{:.1} hours", b.charging_time_minutes / 60.0)),
            ],
        },
        Section {
            heading: "Power Statistics",
            chart: charts::power_chart(samples)?,
            rows: vec![
                row("Average PV Input Power", format!("{:.1}W", p.avg_pv_input)),
                row("Maximum PV Input Power", format!("{:.1}W", p.max_pv_input)),
                row("Total PV Energy Generated", format!("{:.1}Wh", p.total_pv_energy_wh)),
                row("Average AC Output Power", format!("{:.1}W", p.avg_ac_output)),
                row("Maximum AC Output Power", format!("{:.1}W", p.max_ac_output)),
                row("Total AC Energy Consumed", format!("{:.1}Wh", p.total_ac_energy_wh)),
            ],
        },
        Section {
            heading: "Temperature Statistics",
            chart: charts::temperature_chart(samples)?,
            rows: vec![
                row("Average Inverter Temperature", format!("{:.1}°C", t.avg_temp)),
                row("Maximum Inverter Temperature", format!("{:.1}°C", t.max_temp)),
                row("Minimum Inverter Temperature", format!("{:.1}°C", t.min_temp)),
            ],
        },
    ];

    let health = stats.health_summary();
    let template = ReportTemplate {
        period: range.title(),
        sample_count: samples.len(),
        window_start: window.0.format("%Y-%m-%d %H:%M").to_string(),
        window_end: window.1.format("%Y-%m-%d %H:%M").to_string(),
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        sections,
        health: vec![
            row("Battery Health", health.battery.to_string()),
            row("Power Generation", health.generation.to_string()),
            row("Temperature Status", health.temperature.to_string()),
        ],
    };
    Ok(template.render()?)
}

/// `Content-Disposition` file name for an exported report.
pub fn report_file_name(range: ReportRange) -> String {
    format!("solar-report-{}.html", range.as_str())
}
