//! Optimization engine: composes distance, fuel, altitude search and
//! confidence into one result per flight plan.

use crate::aircraft::{AircraftProfile, AircraftTable};
use crate::altitude::{self, AltitudeChoice};
use crate::confidence;
use crate::error::Result;
use crate::fuel::{self, FuelEstimate};
use crate::models::{
    FlightPlan, OptimizationResult, PriorityClass, RecommendationType, WeatherReading,
};
use crate::rules::OptimizationRules;
use crate::spatial;

const JET_STREAM_MIN_ALT_FT: u32 = 30000;
const JET_STREAM_MAX_ALT_FT: u32 = 42000;
const JET_STREAM_MIN_LAT: f64 = 30.0;
const JET_STREAM_MAX_LAT: f64 = 60.0;

/// Stateless engine over immutable reference data.
///
/// Safe to share between concurrent workflow runs.
#[derive(Debug, Clone)]
pub struct OptimizationEngine {
    aircraft: AircraftTable,
    rules: OptimizationRules,
}

impl Default for OptimizationEngine {
    fn default() -> Self {
        Self::new(AircraftTable::standard(), OptimizationRules::default())
    }
}

impl OptimizationEngine {
    pub fn new(aircraft: AircraftTable, rules: OptimizationRules) -> Self {
        Self { aircraft, rules }
    }

    pub fn rules(&self) -> &OptimizationRules {
        &self.rules
    }

    pub fn aircraft(&self) -> &AircraftTable {
        &self.aircraft
    }

    /// Validate a plan against its own invariants and the aircraft table.
    pub fn validate(&self, plan: &FlightPlan) -> Result<&AircraftProfile> {
        plan.validate()?;
        self.aircraft.lookup(&plan.aircraft_type)
    }

    /// Estimate fuel for `plan` flown at `altitude_ft`.
    pub fn estimate_fuel(
        &self,
        plan: &FlightPlan,
        altitude_ft: u32,
        readings: &[WeatherReading],
    ) -> Result<FuelEstimate> {
        let profile = self.validate(plan)?;
        fuel::estimate_fuel(
            plan,
            profile,
            altitude_ft,
            readings,
            self.rules.wind_taper_band_ft,
        )
    }

    /// Search the candidate altitudes for the lowest fuel burn, never
    /// recommending a change above the aircraft's ceiling.
    pub fn optimize_altitude(
        &self,
        plan: &FlightPlan,
        readings: &[WeatherReading],
    ) -> Result<AltitudeChoice> {
        let profile = self.validate(plan)?;
        altitude::search_altitudes(
            plan.cruise_altitude_ft,
            profile.max_cruise_altitude_ft,
            |altitude_ft| {
                fuel::estimate_fuel(
                    plan,
                    profile,
                    altitude_ft,
                    readings,
                    self.rules.wind_taper_band_ft,
                )
            },
        )
    }

    /// Produce the full recommendation for one flight.
    pub fn optimize(
        &self,
        plan: &FlightPlan,
        readings: &[WeatherReading],
    ) -> Result<OptimizationResult> {
        let profile = self.validate(plan)?;
        let choice = self.optimize_altitude(plan, readings)?;
        let original = &choice.requested;
        let chosen = if choice.improves() {
            &choice.best
        } else {
            &choice.requested
        };

        let original_fuel_kg = original.total_fuel_kg;
        let optimized_fuel_kg = chosen.total_fuel_kg.min(original_fuel_kg);
        let fuel_savings_kg = (original_fuel_kg - optimized_fuel_kg).max(0.0);
        let savings_percentage = if original_fuel_kg > 0.0 {
            fuel_savings_kg / original_fuel_kg * 100.0
        } else {
            0.0
        };

        let altitude_change_ft = chosen.altitude_ft.abs_diff(plan.cruise_altitude_ft);
        let recommendation_type = if !choice.improves() {
            RecommendationType::NoChange
        } else if altitude_change_ft >= self.rules.altitude_optimization_threshold_ft {
            RecommendationType::AltitudeOptimization
        } else {
            RecommendationType::RouteModification
        };

        let time_impact_min = self.time_impact(original, chosen, recommendation_type);
        let weather_factors = self.weather_factors(plan, readings, chosen.altitude_ft);
        let rationale = self.rationale(plan, readings, chosen);

        let confidence_score = confidence::confidence(
            savings_percentage,
            confidence::weather_quality(readings),
            confidence::data_completeness(&plan.waypoints, readings),
        );

        let safety_relevant = self.safety_relevant(profile, readings, plan, chosen.altitude_ft);
        let priority = classify_priority(
            &self.rules,
            savings_percentage,
            time_impact_min,
            safety_relevant,
        );

        Ok(OptimizationResult {
            flight_id: plan.flight_id.clone(),
            original_fuel_kg,
            optimized_fuel_kg,
            fuel_savings_kg,
            savings_percentage,
            time_impact_min,
            confidence_score,
            recommendation_type,
            original_altitude_ft: plan.cruise_altitude_ft,
            recommended_altitude_ft: chosen.altitude_ft,
            rationale,
            weather_factors,
            cost_savings: fuel_savings_kg * self.rules.fuel_price_per_kg,
            priority,
        })
    }

    fn time_impact(
        &self,
        original: &FuelEstimate,
        chosen: &FuelEstimate,
        recommendation_type: RecommendationType,
    ) -> i32 {
        let delta_min = ((chosen.flight_time_hr - original.flight_time_hr) * 60.0).round() as i32;
        match recommendation_type {
            RecommendationType::AltitudeOptimization => {
                delta_min + self.rules.coordination_delay_min
            }
            _ => delta_min,
        }
    }

    fn weather_factors(
        &self,
        plan: &FlightPlan,
        readings: &[WeatherReading],
        altitude_ft: u32,
    ) -> Vec<String> {
        let mut factors = Vec::new();

        if jet_stream_present(plan, altitude_ft) {
            factors.push("Jet stream: strong westerly".to_string());
        }

        let usable: Vec<&WeatherReading> = readings.iter().filter(|r| r.is_usable()).collect();
        if !usable.is_empty() {
            let avg_wind =
                usable.iter().map(|r| r.wind_speed_kt).sum::<f64>() / usable.len() as f64;
            if avg_wind > self.rules.strong_wind_kt {
                factors.push(format!("Strong winds averaging {avg_wind:.0} knots"));
            }
        }

        factors.extend(describe_dominant_wind(readings));

        for reading in usable
            .iter()
            .filter(|r| r.wind_speed_kt >= self.rules.severe_wind_kt)
        {
            factors.push(format!(
                "Severe wind {:.0} kt at {}",
                reading.wind_speed_kt, reading.location
            ));
        }

        factors
    }

    fn rationale(
        &self,
        plan: &FlightPlan,
        readings: &[WeatherReading],
        chosen: &FuelEstimate,
    ) -> String {
        let mut parts = Vec::new();

        if chosen.altitude_ft != plan.cruise_altitude_ft {
            parts.push(format!(
                "Altitude change from {} to {} optimizes fuel efficiency",
                flight_level(plan.cruise_altitude_ft),
                flight_level(chosen.altitude_ft)
            ));
        } else {
            parts.push(format!(
                "Requested altitude {} is already the most fuel-efficient candidate",
                flight_level(plan.cruise_altitude_ft)
            ));
        }

        parts.extend(describe_dominant_wind(readings));

        if chosen.wind_impact_kt >= 0.5 {
            parts.push(format!(
                "Favorable tailwind component of {:.0} knots",
                chosen.wind_impact_kt
            ));
        } else if chosen.wind_impact_kt <= -0.5 {
            parts.push(format!(
                "Headwind component of {:.0} knots",
                -chosen.wind_impact_kt
            ));
        }

        parts.join(". ")
    }

    fn safety_relevant(
        &self,
        profile: &AircraftProfile,
        readings: &[WeatherReading],
        plan: &FlightPlan,
        altitude_ft: u32,
    ) -> bool {
        let severe_wind = readings
            .iter()
            .any(|r| r.is_usable() && r.wind_speed_kt >= self.rules.severe_wind_kt);
        // Only a recommended climb or descent can bring the flight near its ceiling.
        let near_ceiling = altitude_ft != plan.cruise_altitude_ft
            && altitude_ft.saturating_add(self.rules.ceiling_margin_ft)
                > profile.max_cruise_altitude_ft;
        severe_wind || near_ceiling
    }
}

/// Three-way priority policy used for message routing.
///
/// High when savings reach the high threshold or anything safety relevant
/// is present; medium on moderate savings or a large time impact.
pub fn classify_priority(
    rules: &OptimizationRules,
    savings_pct: f64,
    time_impact_min: i32,
    safety_relevant: bool,
) -> PriorityClass {
    if safety_relevant || savings_pct >= rules.high_priority_savings_pct {
        PriorityClass::High
    } else if savings_pct >= rules.medium_priority_savings_pct
        || time_impact_min.abs() >= rules.medium_priority_time_impact_min
    {
        PriorityClass::Medium
    } else {
        PriorityClass::Low
    }
}

/// Jet stream is assumed at cruise levels over mid latitudes.
pub fn jet_stream_present(plan: &FlightPlan, altitude_ft: u32) -> bool {
    if !(JET_STREAM_MIN_ALT_FT..=JET_STREAM_MAX_ALT_FT).contains(&altitude_ft) {
        return false;
    }
    let lat = spatial::mean_abs_latitude(&plan.waypoints);
    (JET_STREAM_MIN_LAT..=JET_STREAM_MAX_LAT).contains(&lat)
}

/// Highest-magnitude usable wind reading.
pub fn dominant_wind(readings: &[WeatherReading]) -> Option<&WeatherReading> {
    readings
        .iter()
        .filter(|r| r.is_usable())
        .max_by(|a, b| a.wind_speed_kt.total_cmp(&b.wind_speed_kt))
}

/// "Dominant wind 125 kt from 080° at MID", or nothing in calm air.
fn describe_dominant_wind(readings: &[WeatherReading]) -> Option<String> {
    dominant_wind(readings)
        .filter(|r| r.wind_speed_kt > 0.0)
        .map(|r| {
            format!(
                "Dominant wind {:.0} kt from {:03.0}° at {}",
                r.wind_speed_kt, r.wind_direction_deg, r.location
            )
        })
}

/// Render feet as a flight level, e.g. 38000 -> "FL380".
pub fn flight_level(altitude_ft: u32) -> String {
    format!("FL{:03}", altitude_ft / 100)
}
