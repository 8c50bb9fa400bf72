//! ============================================================
//!  Weather impact model
//!
//!  Maps one forecast day onto three multiplicative efficiency
//!  factors (cloud, temperature, rain), each in [0, 1].
//!
//!  Two calibrations exist because the forecast providers report
//!  different things:
//!   - Numeric      – cloud cover % and rain chance %
//!   - Descriptive  – free-text condition ("patchy rain nearby")
//!
//!  The model never fails: a missing or NaN input yields the
//!  neutral factor 1.0, i.e. "assume favourable conditions".
//! ============================================================

use serde::Deserialize;

use crate::models::prediction::ImpactFactors;
use crate::models::weather::WeatherDayObservation;

// ─── Cloud tables ────────────────────────────────────────────
const CLOUD_CLEAR: f64 = 1.0; // 0-10 % clouds
const CLOUD_PARTLY: f64 = 0.7; // 11-50 %
const CLOUD_MOSTLY: f64 = 0.4; // 51-90 %
const CLOUD_OVERCAST: f64 = 0.2; // 91-100 %

const TEXT_CLOUD_CLEAR: f64 = 1.0;
const TEXT_CLOUD_PARTLY: f64 = 0.75;
const TEXT_CLOUD_MOSTLY: f64 = 0.5;
const TEXT_CLOUD_OVERCAST: f64 = 0.25;

// ─── Rain tables ─────────────────────────────────────────────
const RAIN_NONE: f64 = 1.0; // 0 %
const RAIN_LIGHT: f64 = 0.8; // 1-30 %
const RAIN_MODERATE: f64 = 0.6; // 31-60 %
const RAIN_HEAVY: f64 = 0.4; // 61-100 %

const TEXT_RAIN_NONE: f64 = 1.0;
const TEXT_RAIN_LIGHT: f64 = 0.7;
const TEXT_RAIN_HEAVY: f64 = 0.3;

// ─── Temperature ─────────────────────────────────────────────
/// Outside this range the fixed COLD / HOT floors apply.
const TEMP_RANGE_MIN: f64 = 10.0;
const TEMP_RANGE_MAX: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactVariant {
    Numeric,
    Descriptive,
}

/// Panel temperature de-rating around a flat optimal band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureBand {
    pub optimal_low: f64,
    pub optimal_high: f64,
    /// fraction lost per °C below `optimal_low`
    pub cold_derate_per_c: f64,
    /// fraction lost per °C above `optimal_high`
    pub hot_derate_per_c: f64,
    pub cold_floor: f64,
    pub hot_floor: f64,
}

impl TemperatureBand {
    pub const NUMERIC: TemperatureBand = TemperatureBand {
        optimal_low: 25.0,
        optimal_high: 25.0,
        cold_derate_per_c: 0.003,
        hot_derate_per_c: 0.01,
        cold_floor: 0.95,
        hot_floor: 0.85,
    };

    pub const DESCRIPTIVE: TemperatureBand = TemperatureBand {
        optimal_low: 20.0,
        optimal_high: 25.0,
        cold_derate_per_c: 0.003,
        hot_derate_per_c: 0.02,
        cold_floor: 0.9,
        hot_floor: 0.8,
    };

    pub fn impact(&self, temp_c: Option<f64>) -> f64 {
        let Some(t) = temp_c.filter(|t| t.is_finite()) else {
            return 1.0;
        };
        let factor = if t < TEMP_RANGE_MIN {
            self.cold_floor
        } else if t > TEMP_RANGE_MAX {
            self.hot_floor
        } else if t < self.optimal_low {
            1.0 - (self.optimal_low - t) * self.cold_derate_per_c
        } else if t > self.optimal_high {
            1.0 - (t - self.optimal_high) * self.hot_derate_per_c
        } else {
            1.0
        };
        factor.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherImpactModel {
    pub variant: ImpactVariant,
    pub temperature: TemperatureBand,
}

impl WeatherImpactModel {
    pub fn new(variant: ImpactVariant) -> Self {
        let temperature = match variant {
            ImpactVariant::Numeric => TemperatureBand::NUMERIC,
            ImpactVariant::Descriptive => TemperatureBand::DESCRIPTIVE,
        };
        Self { variant, temperature }
    }

    pub fn factors(&self, day: &WeatherDayObservation) -> ImpactFactors {
        let (cloud_impact, rain_impact) = match self.variant {
            ImpactVariant::Numeric => (cloud_impact_from_cover(day.cloud_cover), rain_impact_from_chance(day.rain_chance)),
            ImpactVariant::Descriptive => {
                let text = day.condition.as_deref();
                (cloud_impact_from_text(text), rain_impact_from_text(text))
            }
        };
        ImpactFactors {
            cloud_impact,
            temp_impact: self.temperature.impact(day.avg_temperature()),
            rain_impact,
        }
    }
}

impl Default for WeatherImpactModel {
    fn default() -> Self {
        Self::new(ImpactVariant::Numeric)
    }
}

pub fn cloud_impact_from_cover(cover_percent: Option<f64>) -> f64 {
    let Some(c) = cover_percent.filter(|c| c.is_finite()) else {
        return CLOUD_CLEAR;
    };
    if c <= 10.0 {
        CLOUD_CLEAR
    } else if c <= 50.0 {
        CLOUD_PARTLY
    } else if c <= 90.0 {
        CLOUD_MOSTLY
    } else {
        CLOUD_OVERCAST
    }
}

/// Substring match, most favourable first so "partly cloudy" is not read as "cloudy".
pub fn cloud_impact_from_text(condition: Option<&str>) -> f64 {
    let Some(text) = condition else {
        return TEXT_CLOUD_CLEAR;
    };
    let text = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
    if has(&["clear", "sunny"]) {
        TEXT_CLOUD_CLEAR
    } else if has(&["few clouds", "partly"]) {
        TEXT_CLOUD_PARTLY
    } else if has(&["scattered", "mostly"]) {
        TEXT_CLOUD_MOSTLY
    } else if has(&["overcast", "cloudy"]) {
        TEXT_CLOUD_OVERCAST
    } else {
        TEXT_CLOUD_PARTLY
    }
}

pub fn rain_impact_from_chance(chance_percent: Option<f64>) -> f64 {
    let Some(r) = chance_percent.filter(|r| r.is_finite()) else {
        return RAIN_NONE;
    };
    if r <= 0.0 {
        RAIN_NONE
    } else if r <= 30.0 {
        RAIN_LIGHT
    } else if r <= 60.0 {
        RAIN_MODERATE
    } else {
        RAIN_HEAVY
    }
}

pub fn rain_impact_from_text(condition: Option<&str>) -> f64 {
    let Some(text) = condition else {
        return TEXT_RAIN_NONE;
    };
    let text = text.to_lowercase();
    if text.contains("thunderstorm") || text.contains("snow") {
        TEXT_RAIN_HEAVY
    } else if text.contains("rain") || text.contains("shower") {
        if text.contains("heavy") { TEXT_RAIN_HEAVY } else { TEXT_RAIN_LIGHT }
    } else {
        TEXT_RAIN_NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(cloud: Option<f64>, rain: Option<f64>, min: Option<f64>, max: Option<f64>) -> WeatherDayObservation {
        let mut d = WeatherDayObservation::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        d.cloud_cover = cloud;
        d.rain_chance = rain;
        d.temp_min = min;
        d.temp_max = max;
        d
    }

    #[test]
    fn cloud_impact_is_monotone_and_clear_at_zero() {
        assert_eq!(cloud_impact_from_cover(Some(0.0)), 1.0);
        let mut last = f64::INFINITY;
        for p in 0..=100 {
            let f = cloud_impact_from_cover(Some(p as f64));
            assert!(f <= last, "cloud impact rose at {p}%");
            assert!((0.0..=1.0).contains(&f));
            last = f;
        }
        assert_eq!(cloud_impact_from_cover(Some(10.0)), 1.0);
        assert_eq!(cloud_impact_from_cover(Some(50.0)), 0.7);
        assert_eq!(cloud_impact_from_cover(Some(90.0)), 0.4);
        assert_eq!(cloud_impact_from_cover(Some(91.0)), 0.2);
    }

    #[test]
    fn temperature_within_operating_range_stays_bounded() {
        for band in [TemperatureBand::NUMERIC, TemperatureBand::DESCRIPTIVE] {
            let mut t = 10.0;
            while t <= 35.0 {
                let f = band.impact(Some(t));
                assert!(f >= 0.8 - 1e-9 && f <= 1.0, "{t}°C gave {f}");
                t += 0.5;
            }
            assert_eq!(band.impact(Some(band.optimal_low)), 1.0);
            assert_eq!(band.impact(Some(band.optimal_high)), 1.0);
        }
    }

    #[test]
    fn temperature_decreases_away_from_optimum() {
        let band = TemperatureBand::DESCRIPTIVE;
        assert_eq!(band.impact(Some(22.0)), 1.0);
        assert!(band.impact(Some(15.0)) < band.impact(Some(19.0)));
        assert!(band.impact(Some(19.0)) < 1.0);
        assert!(band.impact(Some(34.0)) < band.impact(Some(28.0)));
        assert!(band.impact(Some(28.0)) < 1.0);

        let numeric = TemperatureBand::NUMERIC;
        assert!((numeric.impact(Some(15.0)) - 0.97).abs() < 1e-9);
        assert!((numeric.impact(Some(30.0)) - 0.95).abs() < 1e-9);
        assert_eq!(numeric.impact(Some(-5.0)), 0.95);
        assert_eq!(numeric.impact(Some(40.0)), 0.85);
    }

    #[test]
    fn missing_or_nan_inputs_are_neutral() {
        let model = WeatherImpactModel::default();
        let f = model.factors(&day(None, None, None, None));
        assert_eq!(f, ImpactFactors::NEUTRAL);
        let f = model.factors(&day(Some(f64::NAN), Some(f64::NAN), Some(f64::NAN), Some(f64::NAN)));
        assert_eq!(f, ImpactFactors::NEUTRAL);

        let descriptive = WeatherImpactModel::new(ImpactVariant::Descriptive);
        assert_eq!(descriptive.factors(&day(None, None, None, None)), ImpactFactors::NEUTRAL);
    }

    #[test]
    fn rain_chance_bands() {
        assert_eq!(rain_impact_from_chance(Some(0.0)), 1.0);
        assert_eq!(rain_impact_from_chance(Some(30.0)), 0.8);
        assert_eq!(rain_impact_from_chance(Some(45.0)), 0.6);
        assert_eq!(rain_impact_from_chance(Some(61.0)), 0.4);
    }

    #[test]
    fn condition_text_matching() {
        assert_eq!(cloud_impact_from_text(Some("Sunny")), 1.0);
        assert_eq!(cloud_impact_from_text(Some("clear sky")), 1.0);
        assert_eq!(cloud_impact_from_text(Some("Partly cloudy")), 0.75);
        assert_eq!(cloud_impact_from_text(Some("few clouds")), 0.75);
        assert_eq!(cloud_impact_from_text(Some("scattered clouds")), 0.5);
        assert_eq!(cloud_impact_from_text(Some("Overcast")), 0.25);
        assert_eq!(cloud_impact_from_text(Some("Cloudy")), 0.25);
        assert_eq!(cloud_impact_from_text(Some("fog")), 0.75);

        assert_eq!(rain_impact_from_text(Some("Patchy rain nearby")), 0.7);
        assert_eq!(rain_impact_from_text(Some("light shower rain")), 0.7);
        assert_eq!(rain_impact_from_text(Some("Heavy rain")), 0.3);
        assert_eq!(rain_impact_from_text(Some("Thundery outbreaks")), 1.0);
        assert_eq!(rain_impact_from_text(Some("thunderstorm with rain")), 0.3);
        assert_eq!(rain_impact_from_text(Some("light snow")), 0.3);
        assert_eq!(rain_impact_from_text(Some("mist")), 1.0);
    }

    #[test]
    fn ideal_day_has_unit_weather_factor() {
        let f = WeatherImpactModel::default().factors(&day(Some(5.0), Some(0.0), Some(20.0), Some(30.0)));
        assert_eq!(f, ImpactFactors::NEUTRAL);
        assert_eq!(f.weather_factor(), 1.0);
    }

    #[test]
    fn worst_day_uses_lowest_bands() {
        let f = WeatherImpactModel::default().factors(&day(Some(95.0), Some(80.0), Some(35.0), Some(45.0)));
        assert_eq!(f.cloud_impact, CLOUD_OVERCAST);
        assert_eq!(f.temp_impact, TemperatureBand::NUMERIC.hot_floor);
        assert_eq!(f.rain_impact, RAIN_HEAVY);
        assert!((f.weather_factor() - 0.2 * 0.85 * 0.4).abs() < 1e-12);
    }
}
