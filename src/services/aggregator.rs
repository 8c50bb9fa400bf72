use chrono::{DateTime, Utc};

use crate::models::stats::{AggregatedStats, BatteryStats, PowerStats, TemperatureStats};
use crate::models::telemetry::TelemetrySample;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("cannot aggregate an empty sample window")]
    EmptyInput,
}

/// Handling of a charging interval that has not ended by the last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenIntervalPolicy {
    /// Only intervals that end inside the window are counted.
    #[default]
    Discard,
    /// Count the open interval up to the last sample.
    Flush,
}

#[derive(Debug, Clone, Copy)]
enum ChargeState {
    Idle,
    Charging { since: DateTime<Utc> },
}

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Copy)]
struct Extremes {
    sum: f64,
    min: f64,
    max: f64,
}

impl Extremes {
    fn new() -> Self {
        Self { sum: 0.0, min: f64::INFINITY, max: f64::NEG_INFINITY }
    }

    fn push(&mut self, v: f64) {
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn mean(&self, n: usize) -> f64 {
        self.sum / n as f64
    }
}

/// Reduces a time-ordered, non-empty sample window to summary statistics
/// in one pass.
///
/// Missing readings count as 0. Energy is integrated per adjacent pair as
/// `power[i] × (t[i] − t[i−1])`, so the first sample contributes none.
pub fn aggregate(samples: &[TelemetrySample], policy: OpenIntervalPolicy) -> Result<AggregatedStats, AggregationError> {
    let Some(last) = samples.last() else {
        return Err(AggregationError::EmptyInput);
    };

    let mut capacity = Extremes::new();
    let mut voltage = Extremes::new();
    let mut pv = Extremes::new();
    let mut ac = Extremes::new();
    let mut temp = Extremes::new();
    let mut pv_energy_wh = 0.0;
    let mut ac_energy_wh = 0.0;
    let mut charging_ms: i64 = 0;
    let mut state = ChargeState::Idle;
    let mut previous: Option<DateTime<Utc>> = None;

    for sample in samples {
        let d = &sample.data;
        let ts = sample.timestamp;

        capacity.push(d.battery_capacity_or_zero());
        voltage.push(d.battery_voltage_or_zero());
        pv.push(d.pv_input_power_or_zero());
        ac.push(d.ac_output_power_or_zero());
        temp.push(d.heat_sink_temperature_or_zero());

        if let Some(prev) = previous {
            let dt_hours = (ts - prev).num_milliseconds() as f64 / MS_PER_HOUR;
            pv_energy_wh += d.pv_input_power_or_zero() * dt_hours;
            ac_energy_wh += d.ac_output_power_or_zero() * dt_hours;
        }

        state = match (state, d.charging_current_or_zero() > 0.0) {
            (ChargeState::Idle, true) => ChargeState::Charging { since: ts },
            (ChargeState::Charging { since }, false) => {
                charging_ms += (ts - since).num_milliseconds();
                ChargeState::Idle
            }
            (unchanged, _) => unchanged,
        };

        previous = Some(ts);
    }

    if let (OpenIntervalPolicy::Flush, ChargeState::Charging { since }) = (policy, state) {
        charging_ms += (last.timestamp - since).num_milliseconds();
    }

    let n = samples.len();
    Ok(AggregatedStats {
        battery: BatteryStats {
            avg_capacity: capacity.mean(n),
            min_capacity: capacity.min,
            max_capacity: capacity.max,
            avg_voltage: voltage.mean(n),
            charging_time_minutes: charging_ms as f64 / MS_PER_MINUTE,
        },
        power: PowerStats {
            avg_pv_input: pv.mean(n),
            max_pv_input: pv.max,
            total_pv_energy_wh: pv_energy_wh,
            avg_ac_output: ac.mean(n),
            max_ac_output: ac.max,
            total_ac_energy_wh: ac_energy_wh,
        },
        temperature: TemperatureStats {
            avg_temp: temp.mean(n),
            max_temp: temp.max,
            min_temp: temp.min,
        },
    })
}
