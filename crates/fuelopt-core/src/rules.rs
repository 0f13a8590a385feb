//! Optimization rules and thresholds.

use serde::{Deserialize, Serialize};

/// Tunable thresholds for the optimization engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationRules {
    /// Jet fuel price used for cost savings (USD/kg)
    pub fuel_price_per_kg: f64,
    /// Savings percentage at or above which a recommendation is high priority
    pub high_priority_savings_pct: f64,
    /// Savings percentage at or above which a recommendation is medium priority
    pub medium_priority_savings_pct: f64,
    /// Absolute time impact (minutes) that alone makes a recommendation medium priority
    pub medium_priority_time_impact_min: i32,
    /// Altitude change (ft) at or above which the change is an altitude optimization
    pub altitude_optimization_threshold_ft: u32,
    /// ATC coordination delay added to altitude optimizations (minutes)
    pub coordination_delay_min: i32,
    /// Mean wind (kt) above which "strong winds" is reported as a weather factor
    pub strong_wind_kt: f64,
    /// Any single reading at or above this wind (kt) is safety relevant
    pub severe_wind_kt: f64,
    /// Recommending within this margin (ft) of the aircraft ceiling is safety relevant
    pub ceiling_margin_ft: u32,
    /// Vertical distance (ft) over which a wind observation's influence fades out
    pub wind_taper_band_ft: f64,
}

impl Default for OptimizationRules {
    fn default() -> Self {
        Self {
            fuel_price_per_kg: 0.85,
            high_priority_savings_pct: 5.0,
            medium_priority_savings_pct: 2.0,
            medium_priority_time_impact_min: 15,
            altitude_optimization_threshold_ft: 4000,
            coordination_delay_min: 2,
            strong_wind_kt: 100.0,
            severe_wind_kt: 150.0,
            ceiling_margin_ft: 2000,
            wind_taper_band_ft: 8000.0,
        }
    }
}
