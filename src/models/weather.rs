use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One forecast day, normalised from whichever provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherDayObservation {
    pub date: NaiveDate,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    /// Cloud cover (%)
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    /// Chance of rain (%)
    #[serde(default)]
    pub rain_chance: Option<f64>,
    /// Lower-cased condition text, e.g. "partly cloudy"
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub humidity: Option<f64>,
    /// Wind speed (m/s)
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl WeatherDayObservation {
    #[cfg(test)]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            temp_min: None,
            temp_max: None,
            cloud_cover: None,
            rain_chance: None,
            condition: None,
            humidity: None,
            wind_speed: None,
            icon: None,
        }
    }

    /// Mean of the daily extremes; a single known extreme stands in for both.
    pub fn avg_temperature(&self) -> Option<f64> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        match (finite(self.temp_min), finite(self.temp_max)) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            (Some(t), None) | (None, Some(t)) => Some(t),
            (None, None) => None,
        }
    }
}

/// Forecast as served by `/api/weather`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub last_updated: DateTime<Utc>,
    /// Set when the upstream fetch failed and an older forecast is served.
    pub is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub forecast: Vec<WeatherDayObservation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> WeatherDayObservation {
        WeatherDayObservation::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    #[test]
    fn avg_temperature_uses_what_is_known() {
        let mut d = day();
        assert_eq!(d.avg_temperature(), None);
        d.temp_max = Some(30.0);
        assert_eq!(d.avg_temperature(), Some(30.0));
        d.temp_min = Some(20.0);
        assert_eq!(d.avg_temperature(), Some(25.0));
        d.temp_min = Some(f64::NAN);
        assert_eq!(d.avg_temperature(), Some(30.0));
    }
}
