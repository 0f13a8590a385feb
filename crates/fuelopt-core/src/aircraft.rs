//! Aircraft performance reference data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{OptimizationError, Result};

/// Static performance figures for one aircraft type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftProfile {
    pub aircraft_type: String,
    /// Service ceiling for cruise (ft)
    pub max_cruise_altitude_ft: u32,
    pub optimal_cruise_altitude_ft: u32,
    /// True airspeed at cruise (kt)
    pub cruise_speed_kt: f64,
    pub fuel_capacity_kg: f64,
    /// Burn at optimal altitude and empty weight (kg/h)
    pub base_burn_rate_kg_per_hr: f64,
    pub empty_weight_kg: f64,
    pub max_payload_kg: f64,
}

/// Read-only lookup of aircraft profiles keyed by type designator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AircraftTable {
    profiles: HashMap<String, AircraftProfile>,
}

impl AircraftTable {
    pub fn new(profiles: impl IntoIterator<Item = AircraftProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.aircraft_type.to_ascii_uppercase(), p))
                .collect(),
        }
    }

    /// The fleet types the operations team publishes figures for.
    pub fn standard() -> Self {
        Self::new([
            AircraftProfile {
                aircraft_type: "B737-800".into(),
                max_cruise_altitude_ft: 41000,
                optimal_cruise_altitude_ft: 36000,
                cruise_speed_kt: 450.0,
                fuel_capacity_kg: 26000.0,
                base_burn_rate_kg_per_hr: 2400.0,
                empty_weight_kg: 42000.0,
                max_payload_kg: 20000.0,
            },
            AircraftProfile {
                aircraft_type: "A320".into(),
                max_cruise_altitude_ft: 39000,
                optimal_cruise_altitude_ft: 35000,
                cruise_speed_kt: 447.0,
                fuel_capacity_kg: 24000.0,
                base_burn_rate_kg_per_hr: 2300.0,
                empty_weight_kg: 42400.0,
                max_payload_kg: 19000.0,
            },
            AircraftProfile {
                aircraft_type: "B777-300".into(),
                max_cruise_altitude_ft: 43100,
                optimal_cruise_altitude_ft: 38000,
                cruise_speed_kt: 490.0,
                fuel_capacity_kg: 181000.0,
                base_burn_rate_kg_per_hr: 7500.0,
                empty_weight_kg: 167800.0,
                max_payload_kg: 70000.0,
            },
        ])
    }

    pub fn get(&self, aircraft_type: &str) -> Option<&AircraftProfile> {
        self.profiles.get(&aircraft_type.trim().to_ascii_uppercase())
    }

    pub fn lookup(&self, aircraft_type: &str) -> Result<&AircraftProfile> {
        self.get(aircraft_type)
            .ok_or_else(|| OptimizationError::UnknownAircraft(aircraft_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
