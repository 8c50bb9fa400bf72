use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Local, Utc};

use crate::error::{AppError, ErrorBody};
use crate::models::api::{HealthStatus, IngestResponse, ReportQuery, SolarDataQuery, WeatherQuery};
use crate::models::prediction::PredictionResponse;
use crate::models::range::{DayPart, ReportRange, TimeRange};
use crate::models::stats::AggregatedStats;
use crate::models::telemetry::TelemetrySample;
use crate::models::weather::WeatherResponse;
use crate::services::charts;
use crate::services::dashboard_service;
use crate::services::report::ReportError;
use crate::shared_state::AppState;

/// GET /api/solar-data
/// Telemetry for a rolling window
///
/// Returns the stored inverter samples of the last day, three days, week or month,
/// oldest first, optionally restricted to daytime (06:00-18:00) or night-time samples.
#[utoipa::path(
    get,
    path = "/api/solar-data",
    params(SolarDataQuery),
    responses(
        (status = 200, description = "Telemetry samples in ascending time order", body = Vec<TelemetrySample>),
        (status = 500, description = "Storage error", body = ErrorBody)
    )
)]
pub async fn get_solar_data(
    State(state): State<AppState>,
    Query(query): Query<SolarDataQuery>,
) -> Result<Json<Vec<TelemetrySample>>, AppError> {
    let range = TimeRange::parse_lenient(query.time_range.as_deref());
    let part = DayPart::parse_lenient(query.data_type.as_deref());
    let samples = dashboard_service::solar_data(&state, range, part, &Local::now())?;
    Ok(Json(samples))
}

/// POST /api/solar-data
/// Ingest a batch of telemetry samples
#[utoipa::path(
    post,
    path = "/api/solar-data",
    request_body = Vec<TelemetrySample>,
    responses(
        (status = 201, description = "Batch stored", body = IngestResponse),
        (status = 400, description = "Empty batch or non-finite reading", body = ErrorBody),
        (status = 500, description = "Storage error", body = ErrorBody)
    )
)]
pub async fn post_solar_data(
    State(state): State<AppState>,
    Json(samples): Json<Vec<TelemetrySample>>,
) -> Result<impl IntoResponse, AppError> {
    let inserted = dashboard_service::ingest(&state, samples)?;
    Ok((StatusCode::CREATED, Json(IngestResponse { inserted })))
}

/// GET /api/weather
/// Daily forecast for the configured location
///
/// Served from cache while fresh. When the provider is unreachable the last known
/// forecast is returned with `is_stale = true`.
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Forecast", body = WeatherResponse),
        (status = 422, description = "Provider returned unusable data", body = ErrorBody),
        (status = 502, description = "Provider unavailable and nothing cached", body = ErrorBody)
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let force = query.refresh.unwrap_or(false);
    Ok(Json(dashboard_service::get_weather(&state, force, Utc::now()).await?))
}

/// GET /api/predictions
/// Seven-day power prediction
#[utoipa::path(
    get,
    path = "/api/predictions",
    responses(
        (status = 200, description = "Cached or freshly computed predictions", body = PredictionResponse),
        (status = 422, description = "No usable history or short forecast", body = ErrorBody),
        (status = 502, description = "Weather provider unavailable", body = ErrorBody)
    )
)]
pub async fn get_predictions(State(state): State<AppState>) -> Result<Json<PredictionResponse>, AppError> {
    Ok(Json(dashboard_service::get_predictions(&state, Utc::now()).await?))
}

/// GET /api/predictions/chart
/// Seven-day prediction as an SVG line chart
#[utoipa::path(
    get,
    path = "/api/predictions/chart",
    responses(
        (status = 200, description = "SVG chart, empty when there is nothing to plot", body = String, content_type = "image/svg+xml"),
        (status = 422, description = "No usable history or short forecast", body = ErrorBody),
        (status = 502, description = "Weather provider unavailable", body = ErrorBody)
    )
)]
pub async fn get_prediction_chart(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let response = dashboard_service::get_predictions(&state, Utc::now()).await?;
    let svg = charts::prediction_chart(&response.predictions).map_err(ReportError::from)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

/// GET /api/stats
/// Aggregated statistics for a report window
#[utoipa::path(
    get,
    path = "/api/stats",
    params(ReportQuery),
    responses(
        (status = 200, description = "Aggregated statistics", body = AggregatedStats),
        (status = 400, description = "No samples in the window", body = ErrorBody)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AggregatedStats>, AppError> {
    let range = ReportRange::parse_lenient(query.time_range.as_deref());
    let window = dashboard_service::stats(&state, range, &Local::now())?;
    Ok(Json(window.stats))
}

/// GET /api/export-report
/// Download the HTML report
#[utoipa::path(
    get,
    path = "/api/export-report",
    params(ReportQuery),
    responses(
        (status = 200, description = "HTML report attachment", body = String, content_type = "text/html"),
        (status = 400, description = "No samples in the window", body = ErrorBody),
        (status = 500, description = "Rendering failed", body = ErrorBody)
    )
)]
pub async fn export_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = ReportRange::parse_lenient(query.time_range.as_deref());
    let (file_name, html) = dashboard_service::export_report(&state, range, &Local::now())?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        html,
    ))
}

/// GET /api/health
/// Service status
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is running", body = HealthStatus)
    )
)]
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let cached = state.cached_forecast();
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        weather_provider: format!("{:?}", state.config.weather.provider),
        forecast_updated: cached.as_ref().map(|c| c.fetched_at),
        forecast_fresh: cached.is_some_and(|c| c.is_fresh(Utc::now())),
    })
}
