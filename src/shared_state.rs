use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::Config;
use crate::models::weather::WeatherDayObservation;
use crate::services::aggregator::OpenIntervalPolicy;
use crate::services::cache::TtlCache;
use crate::services::power_predictor::PowerPredictor;
use crate::services::store::DataStore;
use crate::services::weather_client::{WeatherClient, WeatherError};

pub type ForecastCache = TtlCache<Vec<WeatherDayObservation>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<DataStore>,
    pub weather: Arc<WeatherClient>,
    pub predictor: Arc<PowerPredictor>,
    /// Last fetched forecast, kept even after it expires for the stale fallback
    pub forecast: Arc<RwLock<Option<ForecastCache>>>,
    /// Held across check, compute and replace of the prediction set
    pub prediction_refresh: Arc<Mutex<()>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, store: DataStore) -> Result<Self, WeatherError> {
        let weather = WeatherClient::new(&config.weather)?;
        let predictor = config.predictor();
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            weather: Arc::new(weather),
            predictor: Arc::new(predictor),
            forecast: Arc::new(RwLock::new(None)),
            prediction_refresh: Arc::new(Mutex::new(())),
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn weather_ttl(&self) -> Duration {
        Duration::minutes(self.config.weather.cache_ttl_minutes)
    }

    pub fn prediction_ttl(&self) -> Duration {
        Duration::hours(self.config.prediction.cache_ttl_hours)
    }

    pub fn open_interval_policy(&self) -> OpenIntervalPolicy {
        if self.config.report.flush_open_charging_interval {
            OpenIntervalPolicy::Flush
        } else {
            OpenIntervalPolicy::Discard
        }
    }

    pub fn cached_forecast(&self) -> Option<ForecastCache> {
        match self.forecast.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                warn!(error = %e, "forecast cache lock poisoned on read");
                None
            }
        }
    }

    pub fn set_forecast(&self, forecast: Vec<WeatherDayObservation>, fetched_at: DateTime<Utc>) {
        match self.forecast.write() {
            Ok(mut guard) => *guard = Some(TtlCache::new(forecast, fetched_at, self.weather_ttl())),
            Err(e) => warn!(error = %e, "forecast cache lock poisoned on write, forecast not cached"),
        }
    }
}
