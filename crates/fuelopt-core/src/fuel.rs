//! Fuel burn model.
//!
//! Starts from the aircraft's base burn rate and applies multiplicative
//! altitude and weight adjustments. Wind changes ground speed, which
//! changes flight time. Reserves are added on top of cruise fuel.

use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftProfile;
use crate::error::{OptimizationError, Result};
use crate::models::{FlightPlan, Waypoint, WeatherReading};
use crate::spatial;

/// Standard passenger plus baggage mass.
pub const PASSENGER_WEIGHT_KG: f64 = 90.0;
/// Contingency reserve as a fraction of cruise fuel.
pub const RESERVE_CONTINGENCY_FRACTION: f64 = 0.05;
/// Holding reserve, expressed as time at the adjusted burn rate.
pub const RESERVE_HOLDING_HOURS: f64 = 0.5;

const ALTITUDE_STEP_FT: f64 = 2000.0;
const ALTITUDE_PENALTY_PER_STEP: f64 = 0.015;
const WEIGHT_PENALTY: f64 = 0.15;

/// Breakdown of one fuel estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEstimate {
    pub altitude_ft: u32,
    pub distance_nm: f64,
    pub altitude_factor: f64,
    pub weight_factor: f64,
    /// Mean along-track wind; positive is a tailwind (kt)
    pub wind_impact_kt: f64,
    pub ground_speed_kt: f64,
    pub flight_time_hr: f64,
    pub burn_rate_kg_per_hr: f64,
    pub cruise_fuel_kg: f64,
    pub reserve_fuel_kg: f64,
    pub total_fuel_kg: f64,
}

/// Burn multiplier for flying away from the optimal altitude.
///
/// Each 2000 ft of deviation costs 1.5 %.
pub fn altitude_factor(altitude_ft: u32, optimal_altitude_ft: u32) -> f64 {
    let deviation = (altitude_ft as f64 - optimal_altitude_ft as f64).abs();
    1.0 + (deviation / ALTITUDE_STEP_FT) * ALTITUDE_PENALTY_PER_STEP
}

/// Burn multiplier for payload carried above empty weight.
pub fn weight_factor(profile: &AircraftProfile, plan: &FlightPlan) -> f64 {
    let empty = profile.empty_weight_kg;
    let total = empty + plan.cargo_weight_kg + plan.passenger_count as f64 * PASSENGER_WEIGHT_KG;
    1.0 + ((total - empty) / empty) * WEIGHT_PENALTY
}

/// Fraction of a reading's wind felt at `altitude_ft`.
fn vertical_weight(reading: &WeatherReading, altitude_ft: u32, taper_band_ft: f64) -> f64 {
    let Some(level) = reading.altitude_ft else {
        return 1.0;
    };
    let separation = (altitude_ft as f64 - level as f64).abs();
    if taper_band_ft <= 0.0 {
        return if separation == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - separation / taper_band_ft).max(0.0)
}

/// Mean along-track wind component over the readings paired with the route.
///
/// Readings pair with waypoints by index. Each reading is resolved against
/// the course flown at its waypoint; unusable readings are skipped.
pub fn wind_impact_kt(
    waypoints: &[Waypoint],
    readings: &[WeatherReading],
    altitude_ft: u32,
    taper_band_ft: f64,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;

    for (index, reading) in readings.iter().enumerate().take(waypoints.len()) {
        if !reading.is_usable() {
            continue;
        }
        let Some(course) = spatial::leg_course_deg(waypoints, index) else {
            continue;
        };
        // Wind direction is where it blows from, so a wind from dead astern
        // (course + 180) is a full tailwind.
        let along_track = -reading.wind_speed_kt
            * (reading.wind_direction_deg - course).to_radians().cos();
        total += along_track * vertical_weight(reading, altitude_ft, taper_band_ft);
        count += 1;
    }

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Estimate total fuel for flying `plan` at `altitude_ft`.
pub fn estimate_fuel(
    plan: &FlightPlan,
    profile: &AircraftProfile,
    altitude_ft: u32,
    readings: &[WeatherReading],
    taper_band_ft: f64,
) -> Result<FuelEstimate> {
    if altitude_ft == 0 {
        return Err(plan.invalid("cruise altitude must be positive"));
    }
    let distance_nm = spatial::route_distance(&plan.waypoints)?;

    let altitude_factor = altitude_factor(altitude_ft, profile.optimal_cruise_altitude_ft);
    let weight_factor = weight_factor(profile, plan);
    if weight_factor < 0.0 {
        return Err(plan.invalid("payload produced a negative weight factor"));
    }
    let burn_rate_kg_per_hr = profile.base_burn_rate_kg_per_hr * altitude_factor * weight_factor;

    let wind_impact_kt = wind_impact_kt(&plan.waypoints, readings, altitude_ft, taper_band_ft);
    let ground_speed_kt = profile.cruise_speed_kt + wind_impact_kt;
    if !ground_speed_kt.is_finite() || ground_speed_kt <= 0.0 {
        return Err(OptimizationError::InvalidWindModel {
            altitude_ft,
            ground_speed_kt,
        });
    }

    let flight_time_hr = distance_nm / ground_speed_kt;
    let cruise_fuel_kg = burn_rate_kg_per_hr * flight_time_hr;
    let reserve_fuel_kg =
        cruise_fuel_kg * RESERVE_CONTINGENCY_FRACTION + burn_rate_kg_per_hr * RESERVE_HOLDING_HOURS;

    Ok(FuelEstimate {
        altitude_ft,
        distance_nm,
        altitude_factor,
        weight_factor,
        wind_impact_kt,
        ground_speed_kt,
        flight_time_hr,
        burn_rate_kg_per_hr,
        cruise_fuel_kg,
        reserve_fuel_kg,
        total_fuel_kg: cruise_fuel_kg + reserve_fuel_kg,
    })
}
