use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::services::power_predictor::{ConfidenceStrategy, HistoryPolicy, PowerPredictor};
use crate::services::weather_impact::{ImpactVariant, WeatherImpactModel};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("cannot parse config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_port() -> u16 { 3000 }
fn default_db_path() -> String { "data/solar.db".to_string() }
fn default_static_dir() -> String { "static".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port(), static_dir: default_static_dir() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeatherProvider {
    /// weatherapi.com `forecast.json`
    WeatherApi,
    /// openweathermap.org 5 day / 3 hour forecast
    OpenWeather,
}

impl WeatherProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            WeatherProvider::WeatherApi => "http://api.weatherapi.com",
            WeatherProvider::OpenWeather => "https://api.openweathermap.org",
        }
    }

    /// Whole days the provider's forecast is guaranteed to cover.
    ///
    /// 40 three-hourly OpenWeatherMap items span 120 hours, which touches
    /// five or six UTC dates depending on the first item's hour.
    pub fn max_forecast_days(self) -> usize {
        match self {
            WeatherProvider::WeatherApi => 14,
            WeatherProvider::OpenWeather => 5,
        }
    }

    fn api_key_env(self) -> &'static str {
        match self {
            WeatherProvider::WeatherApi => "WEATHER_API_KEY",
            WeatherProvider::OpenWeather => "OPENWEATHER_API_KEY",
        }
    }
}

fn default_provider() -> WeatherProvider { WeatherProvider::WeatherApi }
fn default_weather_ttl_minutes() -> i64 { 120 }
fn default_timeout_s() -> u64 { 30 }

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_provider")]
    pub provider: WeatherProvider,
    /// Falls back to the provider's env var when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_weather_ttl_minutes")]
    pub cache_ttl_minutes: i64,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

impl WeatherConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(self.provider.api_key_env()).ok())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicyKind {
    Error,
    Baseline,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PredictionConfig {
    pub forecast_days: usize,
    pub history_days: i64,
    pub min_base_power_w: f64,
    pub empty_history: HistoryPolicyKind,
    pub baseline_power_w: f64,
    pub confidence: ConfidenceStrategy,
    pub impact_variant: ImpactVariant,
    pub cache_ttl_hours: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            forecast_days: 7,
            history_days: 30,
            min_base_power_w: 200.0,
            empty_history: HistoryPolicyKind::Error,
            baseline_power_w: 800.0,
            confidence: ConfidenceStrategy::Stability,
            impact_variant: ImpactVariant::Numeric,
            cache_ttl_hours: 2,
        }
    }
}

impl PredictionConfig {
    pub fn predictor(&self) -> PowerPredictor {
        let history_policy = match self.empty_history {
            HistoryPolicyKind::Error => HistoryPolicy::Fail,
            HistoryPolicyKind::Baseline => HistoryPolicy::Baseline(self.baseline_power_w),
        };
        PowerPredictor {
            model: WeatherImpactModel::new(self.impact_variant),
            min_base_power_w: self.min_base_power_w,
            forecast_days: self.forecast_days,
            history_policy,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Count a charging interval still open at the end of the window.
    pub flush_open_charging_interval: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Predictor for the configured horizon, clamped to what the provider can deliver.
    pub fn predictor(&self) -> PowerPredictor {
        let mut predictor = self.prediction.predictor();
        let max_days = self.weather.provider.max_forecast_days();
        if predictor.forecast_days > max_days {
            warn!(
                provider = ?self.weather.provider,
                configured = predictor.forecast_days,
                max_days,
                "forecast_days exceeds the provider horizon, clamping"
            );
            predictor.forecast_days = max_days;
        }
        predictor
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.weather.latitude)
            || !(-180.0..=180.0).contains(&self.weather.longitude)
        {
            return Err(ConfigError::Invalid(format!(
                "coordinates out of range: {}, {}",
                self.weather.latitude, self.weather.longitude
            )));
        }
        if self.prediction.forecast_days == 0 {
            return Err(ConfigError::Invalid("prediction.forecast_days must be > 0".into()));
        }
        if self.prediction.cache_ttl_hours <= 0 || self.weather.cache_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("cache TTLs must be positive".into()));
        }
        Ok(())
    }
}
