use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One inverter/battery reading as written by the data-acquisition side.
///
/// Every measurement is optional: payloads from the logger are loosely
/// structured and a missing value must not reject the whole sample.
/// Consumers decide the default (the aggregator reads missing values as 0,
/// the predictor skips samples without PV power).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: TelemetryReading,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TelemetryReading {
    /// Battery state of charge (%)
    #[serde(default)]
    pub battery_capacity: Option<f64>,
    /// Battery voltage (V)
    #[serde(default)]
    pub battery_voltage: Option<f64>,
    /// Battery charging current (A)
    #[serde(default)]
    pub battery_charging_current: Option<f64>,
    /// Battery discharge current (A)
    #[serde(default)]
    pub battery_discharge_current: Option<f64>,
    /// Power drawn from the panels (W)
    #[serde(default)]
    pub pv_input_power: Option<f64>,
    /// AC output active power (W)
    #[serde(default)]
    pub ac_output_active_power: Option<f64>,
    /// Inverter heat sink temperature (°C)
    #[serde(default)]
    pub inverter_heat_sink_temperature: Option<f64>,
}

/// Missing or non-finite readings count as zero.
fn or_zero(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

impl TelemetryReading {
    pub fn battery_capacity_or_zero(&self) -> f64 { or_zero(self.battery_capacity) }
    pub fn battery_voltage_or_zero(&self) -> f64 { or_zero(self.battery_voltage) }
    pub fn charging_current_or_zero(&self) -> f64 { or_zero(self.battery_charging_current) }
    pub fn pv_input_power_or_zero(&self) -> f64 { or_zero(self.pv_input_power) }
    pub fn ac_output_power_or_zero(&self) -> f64 { or_zero(self.ac_output_active_power) }
    pub fn heat_sink_temperature_or_zero(&self) -> f64 { or_zero(self.inverter_heat_sink_temperature) }

    /// PV power usable for the historical average: present, finite, positive.
    pub fn valid_pv_input_power(&self) -> Option<f64> {
        self.pv_input_power.filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    pub fn sample_at(minutes: i64, data: TelemetryReading) -> TelemetrySample {
        TelemetrySample { timestamp: t0() + Duration::minutes(minutes), data }
    }

    pub fn pv_sample(minutes: i64, pv: f64) -> TelemetrySample {
        sample_at(minutes, TelemetryReading { pv_input_power: Some(pv), ..Default::default() })
    }

    pub fn charging_sample(minutes: i64, current: f64) -> TelemetrySample {
        sample_at(
            minutes,
            TelemetryReading { battery_charging_current: Some(current), ..Default::default() },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_as_none() {
        let s: TelemetrySample = serde_json::from_str(
            r#"{ "timestamp": "2025-06-01T08:00:00Z", "data": { "pv_input_power": 420.5 } }"#,
        )
        .unwrap();
        assert_eq!(s.data.pv_input_power, Some(420.5));
        assert_eq!(s.data.battery_capacity, None);
        assert_eq!(s.data.battery_capacity_or_zero(), 0.0);
    }

    #[test]
    fn valid_pv_power_rejects_zero_negative_and_nan() {
        let r = |p| TelemetryReading { pv_input_power: Some(p), ..Default::default() };
        assert_eq!(r(150.0).valid_pv_input_power(), Some(150.0));
        assert_eq!(r(0.0).valid_pv_input_power(), None);
        assert_eq!(r(-3.0).valid_pv_input_power(), None);
        assert_eq!(r(f64::NAN).valid_pv_input_power(), None);
        assert_eq!(TelemetryReading::default().valid_pv_input_power(), None);
    }
}
