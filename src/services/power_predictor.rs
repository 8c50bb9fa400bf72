use serde::Deserialize;
use tracing::debug;

use crate::models::prediction::{ImpactFactors, PowerPrediction};
use crate::models::telemetry::TelemetrySample;
use crate::models::weather::WeatherDayObservation;
use crate::services::weather_impact::WeatherImpactModel;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PredictionError {
    #[error("invalid weather data: {0}")]
    InvalidWeatherData(String),
    #[error("no valid historical PV power data available")]
    InsufficientHistoricalData,
}

/// What to do when no usable historical PV reading exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryPolicy {
    Fail,
    /// Substitute a fixed baseline power (W).
    Baseline(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceStrategy {
    /// `0.7 + 0.3 × stability`, stability = 1 − mean |factor − 1|
    Stability,
    /// `max(0.3, (0.9 − 0.1 × day) × mean(factors))`
    Decay,
}

impl ConfidenceStrategy {
    pub fn confidence(&self, factors: &ImpactFactors, day_index: usize) -> f64 {
        let raw = match self {
            ConfidenceStrategy::Stability => 0.7 + 0.3 * factors.stability(),
            ConfidenceStrategy::Decay => {
                let horizon = 0.9 - 0.1 * day_index as f64;
                (horizon * factors.mean()).max(0.3)
            }
        };
        round2(raw.clamp(0.0, 1.0))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerPredictor {
    pub model: WeatherImpactModel,
    /// Lower bound for the historical base power (W).
    pub min_base_power_w: f64,
    pub forecast_days: usize,
    pub history_policy: HistoryPolicy,
    pub confidence: ConfidenceStrategy,
}

impl Default for PowerPredictor {
    fn default() -> Self {
        Self {
            model: WeatherImpactModel::default(),
            min_base_power_w: 200.0,
            forecast_days: 7,
            history_policy: HistoryPolicy::Fail,
            confidence: ConfidenceStrategy::Stability,
        }
    }
}

impl PowerPredictor {
    /// Mean of the positive PV readings, raised to the configured floor.
    pub fn base_power(&self, history: &[TelemetrySample]) -> Result<f64, PredictionError> {
        let (sum, count) = history
            .iter()
            .filter_map(|s| s.data.valid_pv_input_power())
            .fold((0.0, 0usize), |(sum, n), p| (sum + p, n + 1));

        let average = if count == 0 {
            match self.history_policy {
                HistoryPolicy::Fail => return Err(PredictionError::InsufficientHistoricalData),
                HistoryPolicy::Baseline(w) => {
                    debug!(baseline_w = w, "no valid PV history, using baseline");
                    w
                }
            }
        } else {
            sum / count as f64
        };
        Ok(average.max(self.min_base_power_w))
    }

    /// One prediction per forecast day, in forecast order.
    ///
    /// The forecast must cover at least `forecast_days` days; extra days are ignored.
    pub fn predict(
        &self,
        history: &[TelemetrySample],
        forecast: &[WeatherDayObservation],
    ) -> Result<Vec<PowerPrediction>, PredictionError> {
        if forecast.len() < self.forecast_days {
            return Err(PredictionError::InvalidWeatherData(format!(
                "expected {} forecast days, got {}",
                self.forecast_days,
                forecast.len()
            )));
        }
        let base_power = self.base_power(history)?;
        debug!(base_power, samples = history.len(), "computing predictions");

        let predictions = forecast
            .iter()
            .take(self.forecast_days)
            .enumerate()
            .map(|(day_index, day)| {
                let factors = self.model.factors(day);
                let predicted = (base_power * factors.weather_factor()).round().max(0.0);
                PowerPrediction {
                    date: day.date,
                    predicted_power: predicted as u32,
                    confidence: self.confidence.confidence(&factors, day_index),
                    weather: day.clone(),
                    factors,
                }
            })
            .collect();
        Ok(predictions)
    }
}
