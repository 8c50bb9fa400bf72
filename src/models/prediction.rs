use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::weather::WeatherDayObservation;

/// Per-variable efficiency multipliers, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImpactFactors {
    pub cloud_impact: f64,
    pub temp_impact: f64,
    pub rain_impact: f64,
}

impl ImpactFactors {
    pub const NEUTRAL: ImpactFactors = ImpactFactors { cloud_impact: 1.0, temp_impact: 1.0, rain_impact: 1.0 };

    pub fn weather_factor(&self) -> f64 {
        self.cloud_impact * self.temp_impact * self.rain_impact
    }

    pub fn mean(&self) -> f64 {
        (self.cloud_impact + self.temp_impact + self.rain_impact) / 3.0
    }

    /// 1 minus the mean distance of the factors from ideal.
    pub fn stability(&self) -> f64 {
        let deviation = (self.cloud_impact - 1.0).abs()
            + (self.temp_impact - 1.0).abs()
            + (self.rain_impact - 1.0).abs();
        1.0 - deviation / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PowerPrediction {
    pub date: NaiveDate,
    /// Predicted PV power (W)
    pub predicted_power: u32,
    /// Heuristic score in [0, 1], two decimals
    pub confidence: f64,
    pub weather: WeatherDayObservation,
    pub factors: ImpactFactors,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictionResponse {
    pub last_updated: DateTime<Utc>,
    /// True when served from the store without recomputing.
    pub cached: bool,
    pub predictions: Vec<PowerPrediction>,
}
