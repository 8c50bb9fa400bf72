use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::prediction::PredictionResponse;
use crate::models::range::{DayPart, ReportRange, TimeRange};
use crate::models::stats::AggregatedStats;
use crate::models::telemetry::TelemetrySample;
use crate::models::weather::{WeatherDayObservation, WeatherResponse};
use crate::services::aggregator;
use crate::services::report::{self, ReportInput};
use crate::services::weather_client::WeatherError;
use crate::shared_state::AppState;

fn weather_response(state: &AppState, forecast: Vec<WeatherDayObservation>, last_updated: DateTime<Utc>) -> WeatherResponse {
    let (latitude, longitude) = state.weather.coordinates();
    WeatherResponse { latitude, longitude, last_updated, is_stale: false, error: None, forecast }
}

/// Returns the forecast from memory, the database or the provider, in that order.
///
/// A failed fetch falls back to the last known forecast flagged as stale.
pub async fn get_weather(state: &AppState, force_refresh: bool, now: DateTime<Utc>) -> Result<WeatherResponse, AppError> {
    if !force_refresh {
        if let Some(cached) = state.cached_forecast().filter(|c| c.is_fresh(now)) {
            return Ok(weather_response(state, cached.value, cached.fetched_at));
        }
        if state.cached_forecast().is_none() {
            // first request after a restart
            if let Some((forecast, fetched_at)) = state.store.latest_forecast()? {
                state.set_forecast(forecast.clone(), fetched_at);
                if fetched_at + state.weather_ttl() > now {
                    info!(%fetched_at, "weather forecast restored from database");
                    return Ok(weather_response(state, forecast, fetched_at));
                }
            }
        }
    }

    match state.weather.fetch_forecast(state.predictor.forecast_days).await {
        Ok(forecast) => {
            if let Err(e) = state.store.store_forecast(&forecast, now) {
                warn!(error = %e, "failed to persist weather forecast");
            }
            state.set_forecast(forecast.clone(), now);
            Ok(weather_response(state, forecast, now))
        }
        Err(e) => {
            let fallback = match state.cached_forecast() {
                Some(c) => Some((c.value, c.fetched_at)),
                None => state.store.latest_forecast()?,
            };
            let Some((forecast, fetched_at)) = fallback else {
                return Err(e.into());
            };
            warn!(error = %e, %fetched_at, "weather fetch failed, serving stale forecast");
            Ok(WeatherResponse {
                is_stale: true,
                error: Some(e.to_string()),
                ..weather_response(state, forecast, fetched_at)
            })
        }
    }
}

/// Serves the stored prediction set while fresh, otherwise recomputes and replaces it.
///
/// Only a fresh forecast is used, starting from today's date.
pub async fn get_predictions(state: &AppState, now: DateTime<Utc>) -> Result<PredictionResponse, AppError> {
    let _refresh = state.prediction_refresh.lock().await;

    let expected = state.predictor.forecast_days;
    if let Some(cached) = state.store.fresh_predictions(now, state.prediction_ttl(), expected)? {
        return Ok(PredictionResponse { last_updated: cached.fetched_at, cached: true, predictions: cached.value });
    }

    let weather = get_weather(state, false, now).await?;
    if weather.is_stale {
        warn!(last_updated = %weather.last_updated, "refusing to predict from a stale forecast");
        let reason = weather.error.unwrap_or_else(|| "forecast expired".into());
        return Err(WeatherError::UpstreamUnavailable(reason).into());
    }
    let today = now.date_naive();
    let forecast: Vec<_> = weather.forecast.into_iter().filter(|d| d.date >= today).collect();

    let history_start = now - Duration::days(state.config.prediction.history_days);
    let history = state.store.telemetry_between(history_start, now)?;
    let predictions = state.predictor.predict(&history, &forecast)?;
    state.store.replace_predictions(&predictions, now)?;
    info!(days = predictions.len(), history_samples = history.len(), "predictions refreshed");

    Ok(PredictionResponse { last_updated: now, cached: false, predictions })
}

pub fn solar_data<Tz: TimeZone>(
    state: &AppState,
    range: TimeRange,
    part: DayPart,
    now: &DateTime<Tz>,
) -> Result<Vec<TelemetrySample>, AppError> {
    let tz = now.timezone();
    let samples = state.store.telemetry_between(range.start(now), now.with_timezone(&Utc))?;
    Ok(samples.into_iter().filter(|s| part.contains(s, &tz)).collect())
}

/// Stores a telemetry batch; the batch is rejected as a whole if any sample is unusable.
pub fn ingest(state: &AppState, mut samples: Vec<TelemetrySample>) -> Result<usize, AppError> {
    if samples.is_empty() {
        return Err(AppError::BadRequest("telemetry batch is empty".into()));
    }
    let non_finite = samples.iter().position(|s| {
        let d = &s.data;
        [
            d.battery_capacity,
            d.battery_voltage,
            d.battery_charging_current,
            d.battery_discharge_current,
            d.pv_input_power,
            d.ac_output_active_power,
            d.inverter_heat_sink_temperature,
        ]
        .iter()
        .flatten()
        .any(|v| !v.is_finite())
    });
    if let Some(index) = non_finite {
        return Err(AppError::BadRequest(format!("sample {index} has a non-finite reading")));
    }
    samples.sort_by_key(|s| s.timestamp);
    Ok(state.store.insert_telemetry(&samples)?)
}

#[derive(Debug)]
pub struct StatsWindow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub samples: Vec<TelemetrySample>,
    pub stats: AggregatedStats,
}

pub fn stats<Tz: TimeZone>(state: &AppState, range: ReportRange, now: &DateTime<Tz>) -> Result<StatsWindow<Tz>, AppError> {
    let tz = now.timezone();
    let (start, end) = range.window(now);
    let samples = state.store.telemetry_between(start, end)?;
    let stats = aggregator::aggregate(&samples, state.open_interval_policy())?;
    Ok(StatsWindow { start: start.with_timezone(&tz), end: end.with_timezone(&tz), samples, stats })
}

/// Rendered report and its download file name.
pub fn export_report<Tz: TimeZone>(state: &AppState, range: ReportRange, now: &DateTime<Tz>) -> Result<(String, String), AppError>
where
    Tz::Offset: std::fmt::Display,
{
    let window = stats(state, range, now)?;
    let html = report::render_report(ReportInput {
        range,
        window: (window.start, window.end),
        generated_at: now.clone(),
        stats: &window.stats,
        samples: &window.samples,
    })?;
    info!(range = range.as_str(), samples = window.samples.len(), "report exported");
    Ok((report::report_file_name(range), html))
}
