use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ─── Query parameters ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SolarDataQuery {
    /// `1d`, `3d`, `1w` or `1m`; anything else means `1d`
    pub time_range: Option<String>,
    /// `all`, `day` or `night`
    pub data_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    /// Bypass the in-memory forecast cache
    pub refresh: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// `today`, `yesterday`, `week` or `month`; anything else means `today`
    pub time_range: Option<String>,
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub inserted: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub weather_provider: String,
    /// Fetch time of the forecast held in memory, if any
    pub forecast_updated: Option<DateTime<Utc>>,
    pub forecast_fresh: bool,
}
