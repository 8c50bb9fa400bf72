use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AggregatedStats {
    pub battery: BatteryStats,
    pub power: PowerStats,
    pub temperature: TemperatureStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatteryStats {
    /// %
    pub avg_capacity: f64,
    pub min_capacity: f64,
    pub max_capacity: f64,
    /// V
    pub avg_voltage: f64,
    /// Sum of closed charging intervals (min)
    pub charging_time_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PowerStats {
    /// W
    pub avg_pv_input: f64,
    pub max_pv_input: f64,
    /// Wh
    pub total_pv_energy_wh: f64,
    /// W
    pub avg_ac_output: f64,
    pub max_ac_output: f64,
    /// Wh
    pub total_ac_energy_wh: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureStats {
    /// °C
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum BatteryHealth {
    Excellent,
    Good,
    NeedsAttention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum GenerationLevel {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum TemperatureStatus {
    Normal,
    Warning,
    Critical,
}

/// Coarse classification shown at the end of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthSummary {
    pub battery: BatteryHealth,
    pub generation: GenerationLevel,
    pub temperature: TemperatureStatus,
}

impl AggregatedStats {
    pub fn health_summary(&self) -> HealthSummary {
        let battery = if self.battery.avg_capacity > 80.0 {
            BatteryHealth::Excellent
        } else if self.battery.avg_capacity > 60.0 {
            BatteryHealth::Good
        } else {
            BatteryHealth::NeedsAttention
        };
        let generation = if self.power.total_pv_energy_wh > 1000.0 {
            GenerationLevel::High
        } else if self.power.total_pv_energy_wh > 500.0 {
            GenerationLevel::Moderate
        } else {
            GenerationLevel::Low
        };
        let temperature = if self.temperature.avg_temp < 40.0 {
            TemperatureStatus::Normal
        } else if self.temperature.avg_temp < 50.0 {
            TemperatureStatus::Warning
        } else {
            TemperatureStatus::Critical
        };
        HealthSummary { battery, generation, temperature }
    }
}

impl std::fmt::Display for BatteryHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BatteryHealth::Excellent => "Excellent",
            BatteryHealth::Good => "Good",
            BatteryHealth::NeedsAttention => "Needs Attention",
        })
    }
}

impl std::fmt::Display for GenerationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GenerationLevel::High => "High",
            GenerationLevel::Moderate => "Moderate",
            GenerationLevel::Low => "Low",
        })
    }
}

impl std::fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TemperatureStatus::Normal => "Normal",
            TemperatureStatus::Warning => "Warning",
            TemperatureStatus::Critical => "Critical",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_thresholds_are_strict() {
        let mut stats = AggregatedStats::default();
        stats.battery.avg_capacity = 80.0;
        stats.power.total_pv_energy_wh = 1000.5;
        stats.temperature.avg_temp = 40.0;
        let h = stats.health_summary();
        assert_eq!(h.battery, BatteryHealth::Good);
        assert_eq!(h.generation, GenerationLevel::High);
        assert_eq!(h.temperature, TemperatureStatus::Warning);

        stats.battery.avg_capacity = 55.0;
        stats.power.total_pv_energy_wh = 500.0;
        stats.temperature.avg_temp = 50.0;
        let h = stats.health_summary();
        assert_eq!(h.battery, BatteryHealth::NeedsAttention);
        assert_eq!(h.generation, GenerationLevel::Low);
        assert_eq!(h.temperature, TemperatureStatus::Critical);
        assert_eq!(h.battery.to_string(), "Needs Attention");
    }
}
