use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::{WeatherConfig, WeatherProvider};
use crate::models::weather::WeatherDayObservation;

const USER_AGENT: &str = concat!("SolarDashboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather provider unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid weather data: {0}")]
    InvalidWeatherData(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::UpstreamUnavailable(e.to_string())
    }
}

// ─── WeatherAPI.com wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WeatherApiResponse {
    forecast: Option<WeatherApiForecast>,
}

#[derive(Debug, Deserialize)]
struct WeatherApiForecast {
    forecastday: Option<Vec<WeatherApiForecastDay>>,
}

#[derive(Debug, Deserialize)]
struct WeatherApiForecastDay {
    date: NaiveDate,
    day: Option<WeatherApiDay>,
}

#[derive(Debug, Deserialize)]
struct WeatherApiDay {
    maxtemp_c: Option<f64>,
    mintemp_c: Option<f64>,
    avghumidity: Option<f64>,
    maxwind_kph: Option<f64>,
    daily_chance_of_rain: Option<f64>,
    cloud: Option<f64>,
    condition: Option<WeatherApiCondition>,
}

#[derive(Debug, Deserialize)]
struct WeatherApiCondition {
    text: Option<String>,
    icon: Option<String>,
}

// ─── OpenWeatherMap wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    list: Option<Vec<OpenWeatherItem>>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherItem {
    dt: i64,
    main: OpenWeatherMain,
    #[serde(default)]
    wind: Option<OpenWeatherWind>,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
    #[serde(default)]
    clouds: Option<OpenWeatherClouds>,
    /// probability of precipitation, 0..1
    #[serde(default)]
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherClouds {
    all: Option<f64>,
}

/// Forecast provider client
///
pub struct WeatherClient {
    client: Client,
    provider: WeatherProvider,
    base_url: String,
    api_key: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl WeatherClient {
    /// Returns a new instance of WeatherClient
    ///
    /// # Arguments
    ///
    /// * 'cfg' - weather section of the configuration
    pub fn new(cfg: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            provider: cfg.provider,
            base_url: cfg.base_url(),
            api_key: cfg.resolve_api_key(),
            latitude: cfg.latitude,
            longitude: cfg.longitude,
        })
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Fetches up to `days` forecast days from the configured provider
    ///
    /// # Arguments
    ///
    /// * 'days' - number of days to request
    pub async fn fetch_forecast(&self, days: usize) -> Result<Vec<WeatherDayObservation>, WeatherError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(WeatherError::UpstreamUnavailable("no weather API key configured".into()));
        };
        let location = format!("{},{}", self.latitude, self.longitude);
        let (lat, lon) = (self.latitude.to_string(), self.longitude.to_string());
        let days_param = days.to_string();

        let request = match self.provider {
            WeatherProvider::WeatherApi => self
                .client
                .get(format!("{}/v1/forecast.json", self.base_url))
                .query(&[("key", key), ("q", location.as_str()), ("days", days_param.as_str()), ("aqi", "no")]),
            WeatherProvider::OpenWeather => self
                .client
                .get(format!("{}/data/2.5/forecast", self.base_url))
                .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("appid", key), ("units", "metric")]),
        };

        info!(provider = ?self.provider, days, "fetching weather forecast");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "weather provider returned an error");
            return Err(WeatherError::UpstreamUnavailable(format!("{}: {}", status, body)));
        }

        let json = response.text().await?;
        let mut forecast = match self.provider {
            WeatherProvider::WeatherApi => parse_weather_api(&json)?,
            WeatherProvider::OpenWeather => parse_open_weather(&json)?,
        };
        forecast.truncate(days);
        debug!(days = forecast.len(), "weather forecast parsed");
        Ok(forecast)
    }
}

fn invalid(e: impl std::fmt::Display) -> WeatherError {
    WeatherError::InvalidWeatherData(e.to_string())
}

/// Converts a WeatherAPI.com `forecast.json` body into forecast days
pub fn parse_weather_api(json: &str) -> Result<Vec<WeatherDayObservation>, WeatherError> {
    let body: WeatherApiResponse = serde_json::from_str(json).map_err(invalid)?;
    let days = body
        .forecast
        .and_then(|f| f.forecastday)
        .ok_or_else(|| invalid("missing forecast.forecastday"))?;

    days.into_iter()
        .map(|fd| {
            let day = fd.day.ok_or_else(|| invalid(format!("forecast day {} has no data", fd.date)))?;
            let (condition, icon) = match day.condition {
                Some(c) => (c.text.map(|t| t.to_lowercase()), c.icon),
                None => (None, None),
            };
            Ok(WeatherDayObservation {
                date: fd.date,
                temp_min: day.mintemp_c,
                temp_max: day.maxtemp_c,
                cloud_cover: day.cloud,
                rain_chance: day.daily_chance_of_rain,
                condition,
                humidity: day.avghumidity,
                wind_speed: day.maxwind_kph.map(|kph| kph / 3.6),
                icon,
            })
        })
        .collect()
}

/// Folds 3-hourly OpenWeatherMap items into one observation per UTC day
///
/// Temperatures are the daily extremes and rain chance the highest
/// precipitation probability; the remaining fields come from the first
/// item of the day.
pub fn parse_open_weather(json: &str) -> Result<Vec<WeatherDayObservation>, WeatherError> {
    let body: OpenWeatherResponse = serde_json::from_str(json).map_err(invalid)?;
    let items = body.list.ok_or_else(|| invalid("missing list"))?;

    let mut days: BTreeMap<NaiveDate, WeatherDayObservation> = BTreeMap::new();
    for item in items {
        let date = DateTime::from_timestamp(item.dt, 0)
            .ok_or_else(|| invalid(format!("bad timestamp {}", item.dt)))?
            .date_naive();
        let rain = item.pop.map(|p| p * 100.0);

        match days.get_mut(&date) {
            Some(day) => {
                day.temp_min = min_opt(day.temp_min, item.main.temp_min);
                day.temp_max = max_opt(day.temp_max, item.main.temp_max);
                day.rain_chance = max_opt(day.rain_chance, rain);
            }
            None => {
                let condition = item.weather.first();
                days.insert(
                    date,
                    WeatherDayObservation {
                        date,
                        temp_min: item.main.temp_min,
                        temp_max: item.main.temp_max,
                        cloud_cover: item.clouds.and_then(|c| c.all),
                        rain_chance: rain,
                        condition: condition.and_then(|c| c.description.as_ref()).map(|d| d.to_lowercase()),
                        humidity: item.main.humidity,
                        wind_speed: item.wind.and_then(|w| w.speed),
                        icon: condition.and_then(|c| c.icon.clone()),
                    },
                );
            }
        }
    }
    Ok(days.into_values().collect())
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER_API_BODY: &str = r#"{
        "location": { "name": "Chisinau" },
        "forecast": { "forecastday": [
            { "date": "2025-06-01", "day": {
                "maxtemp_c": 28.4, "mintemp_c": 16.2, "avghumidity": 55,
                "maxwind_kph": 18.0, "daily_chance_of_rain": 20, "cloud": 35,
                "condition": { "text": "Partly Cloudy", "icon": "//cdn.weatherapi.com/116.png" } } },
            { "date": "2025-06-02", "day": { "maxtemp_c": 30.0, "mintemp_c": 18.0 } }
        ] }
    }"#;

    const OPEN_WEATHER_BODY: &str = r#"{ "list": [
        { "dt": 1748736000, "main": { "temp_min": 14.0, "temp_max": 15.0, "humidity": 70 },
          "wind": { "speed": 3.2 }, "weather": [ { "description": "Scattered Clouds", "icon": "03d" } ],
          "clouds": { "all": 40 }, "pop": 0.1 },
        { "dt": 1748746800, "main": { "temp_min": 19.5, "temp_max": 24.0, "humidity": 50 },
          "weather": [ { "description": "light rain", "icon": "10d" } ], "pop": 0.65 },
        { "dt": 1748822400, "main": { "temp_min": 12.0, "temp_max": 13.0 }, "weather": [] }
    ] }"#;

    fn config(server_url: &str, provider: WeatherProvider) -> WeatherConfig {
        WeatherConfig {
            provider,
            api_key: Some("test-key".into()),
            base_url: Some(server_url.to_string()),
            latitude: 47.06,
            longitude: 28.87,
            cache_ttl_minutes: 120,
            timeout_s: 5,
        }
    }

    #[test]
    fn weather_api_days_are_normalised() {
        let days = parse_weather_api(WEATHER_API_BODY).unwrap();
        assert_eq!(days.len(), 2);
        let d = &days[0];
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(d.temp_max, Some(28.4));
        assert_eq!(d.cloud_cover, Some(35.0));
        assert_eq!(d.rain_chance, Some(20.0));
        assert_eq!(d.condition.as_deref(), Some("partly cloudy"));
        assert!((d.wind_speed.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(days[1].condition, None);
        assert_eq!(days[1].cloud_cover, None);
    }

    #[test]
    fn weather_api_without_forecast_list_is_invalid() {
        assert!(matches!(parse_weather_api(r#"{ "forecast": {} }"#), Err(WeatherError::InvalidWeatherData(_))));
        assert!(matches!(parse_weather_api(r#"{ "error": "x" }"#), Err(WeatherError::InvalidWeatherData(_))));
        assert!(matches!(parse_weather_api("not json"), Err(WeatherError::InvalidWeatherData(_))));
        assert!(matches!(
            parse_weather_api(r#"{ "forecast": { "forecastday": [ { "date": "2025-06-01" } ] } }"#),
            Err(WeatherError::InvalidWeatherData(_))
        ));
    }

    #[test]
    fn open_weather_items_fold_per_day() {
        let days = parse_open_weather(OPEN_WEATHER_BODY).unwrap();
        assert_eq!(days.len(), 2);
        let d = &days[0];
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(d.temp_min, Some(14.0));
        assert_eq!(d.temp_max, Some(24.0));
        assert_eq!(d.rain_chance, Some(65.0));
        assert_eq!(d.cloud_cover, Some(40.0));
        assert_eq!(d.condition.as_deref(), Some("scattered clouds"));
        assert_eq!(d.icon.as_deref(), Some("03d"));
        assert_eq!(days[1].condition, None);
    }

    #[tokio::test]
    async fn fetches_weather_api_forecast() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast.json")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("key".into(), "test-key".into()),
                mockito::Matcher::UrlEncoded("days".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WEATHER_API_BODY)
            .create_async()
            .await;

        let client = WeatherClient::new(&config(&server.url(), WeatherProvider::WeatherApi)).unwrap();
        let days = client.fetch_forecast(1).await.unwrap();
        assert_eq!(days.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_status_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data/2.5/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = WeatherClient::new(&config(&server.url(), WeatherProvider::OpenWeather)).unwrap();
        let err = client.fetch_forecast(7).await.unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamUnavailable(ref m) if m.contains("maintenance")));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_request() {
        let cfg = config("http://127.0.0.1:9", WeatherProvider::WeatherApi);
        let client = WeatherClient { api_key: None, ..WeatherClient::new(&cfg).unwrap() };
        assert!(matches!(client.fetch_forecast(7).await, Err(WeatherError::UpstreamUnavailable(_))));
    }
}
