//! Core data models for fuel optimization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OptimizationError, Result};

const DEFAULT_PASSENGER_COUNT: u32 = 150;
const DEFAULT_CARGO_WEIGHT_KG: f64 = 5000.0;

/// A named point on the planned route.
///
/// Coordinates are checked on construction and the value cannot be
/// changed afterwards, so every `Waypoint` in a plan is known to be valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WaypointRecord")]
pub struct Waypoint {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WaypointRecord {
    name: String,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
    #[serde(default)]
    altitude: Option<u32>,
}

impl TryFrom<WaypointRecord> for Waypoint {
    type Error = OptimizationError;

    fn try_from(record: WaypointRecord) -> Result<Self> {
        let waypoint = Waypoint::new(record.name, record.latitude, record.longitude)?;
        Ok(match record.altitude {
            Some(altitude) => waypoint.with_altitude(altitude),
            None => waypoint,
        })
    }
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(OptimizationError::InvalidRoute(
                "waypoint name must not be empty".to_string(),
            ));
        }
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(OptimizationError::InvalidCoordinate {
                name,
                lat: latitude,
                lon: longitude,
            });
        }
        Ok(Self {
            name,
            latitude,
            longitude,
            altitude: None,
        })
    }

    /// Attach a crossing altitude in feet.
    pub fn with_altitude(mut self, altitude_ft: u32) -> Self {
        self.altitude = Some(altitude_ft);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Crossing altitude in feet, if the route specifies one.
    pub fn altitude(&self) -> Option<u32> {
        self.altitude
    }

    fn renamed_upper(&self) -> Self {
        Self {
            name: self.name.to_ascii_uppercase(),
            ..self.clone()
        }
    }
}

/// A flight plan submitted for optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPlan {
    pub flight_id: String,
    pub origin: String,
    pub destination: String,
    pub aircraft_type: String,
    pub departure_time: DateTime<Utc>,
    /// Ordered route, origin first.
    #[serde(alias = "route_waypoints")]
    pub waypoints: Vec<Waypoint>,
    pub planned_fuel_kg: f64,
    /// Requested cruise altitude in feet
    pub cruise_altitude_ft: u32,
    #[serde(default = "default_passenger_count")]
    pub passenger_count: u32,
    #[serde(default = "default_cargo_weight_kg")]
    pub cargo_weight_kg: f64,
}

fn default_passenger_count() -> u32 {
    DEFAULT_PASSENGER_COUNT
}

fn default_cargo_weight_kg() -> f64 {
    DEFAULT_CARGO_WEIGHT_KG
}

impl FlightPlan {
    /// Check the plan-level invariants that do not depend on reference data.
    pub fn validate(&self) -> Result<()> {
        if self.flight_id.trim().is_empty() {
            return Err(self.invalid("flight id must not be empty"));
        }
        if self.waypoints.len() < 2 {
            return Err(OptimizationError::InvalidRoute(format!(
                "flight {} has {} waypoint(s), at least 2 required",
                self.flight_id,
                self.waypoints.len()
            )));
        }
        if !self.planned_fuel_kg.is_finite() || self.planned_fuel_kg <= 0.0 {
            return Err(self.invalid("planned fuel must be positive"));
        }
        if self.cruise_altitude_ft == 0 {
            return Err(self.invalid("requested cruise altitude must be positive"));
        }
        if !self.cargo_weight_kg.is_finite() || self.cargo_weight_kg < 0.0 {
            return Err(self.invalid("cargo weight must not be negative"));
        }
        Ok(())
    }

    /// Copy of the plan with identifiers trimmed and codes upper-cased.
    pub fn normalized(&self) -> FlightPlan {
        FlightPlan {
            flight_id: self.flight_id.trim().to_string(),
            origin: self.origin.trim().to_ascii_uppercase(),
            destination: self.destination.trim().to_ascii_uppercase(),
            aircraft_type: self.aircraft_type.trim().to_ascii_uppercase(),
            waypoints: self.waypoints.iter().map(Waypoint::renamed_upper).collect(),
            ..self.clone()
        }
    }

    pub(crate) fn invalid(&self, reason: &str) -> OptimizationError {
        OptimizationError::InvalidFlightPlan {
            flight_id: self.flight_id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Weather observed at one waypoint, paired with the route by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location: String,
    pub wind_speed_kt: f64,
    /// Direction the wind blows from, degrees true
    pub wind_direction_deg: f64,
    pub temperature_c: f64,
    /// Level the wind was observed at; `None` applies at every altitude.
    #[serde(default)]
    pub altitude_ft: Option<u32>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    /// Placeholder standing in for a missing observation; never used as data.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub estimated: bool,
}

impl WeatherReading {
    pub fn new(
        location: impl Into<String>,
        wind_speed_kt: f64,
        wind_direction_deg: f64,
        temperature_c: f64,
    ) -> Self {
        Self {
            location: location.into(),
            wind_speed_kt,
            wind_direction_deg,
            temperature_c,
            altitude_ft: None,
            observed_at: None,
            estimated: false,
        }
    }

    /// An observation of calm air.
    pub fn calm(location: impl Into<String>) -> Self {
        Self::new(location, 0.0, 0.0, 15.0)
    }

    /// Stand-in for a waypoint with no observation. Keeps readings aligned
    /// with the route without counting as data.
    pub fn missing(location: impl Into<String>) -> Self {
        Self {
            estimated: true,
            ..Self::calm(location)
        }
    }

    pub fn at_altitude(mut self, altitude_ft: u32) -> Self {
        self.altitude_ft = Some(altitude_ft);
        self
    }

    /// Whether the reading's values can be trusted by the wind model.
    pub fn is_usable(&self) -> bool {
        !self.estimated
            && self.wind_speed_kt.is_finite()
            && self.wind_speed_kt >= 0.0
            && self.wind_direction_deg.is_finite()
            && (0.0..=360.0).contains(&self.wind_direction_deg)
            && self.temperature_c.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    /// Cruise altitude change of at least the configured threshold
    AltitudeOptimization,
    /// Smaller step change filed as a route amendment
    RouteModification,
    /// Requested altitude is already the best candidate
    NoChange,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::AltitudeOptimization => "altitude_optimization",
            RecommendationType::RouteModification => "route_modification",
            RecommendationType::NoChange => "no_change",
        }
    }
}

/// Three-way routing priority derived by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Low,
    Medium,
    High,
    /// Any label this build does not know about.
    #[serde(other)]
    Unclassified,
}

impl PriorityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::Low => "low",
            PriorityClass::Medium => "medium",
            PriorityClass::High => "high",
            PriorityClass::Unclassified => "unclassified",
        }
    }
}

/// Outcome of optimizing one flight plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub flight_id: String,
    /// Fuel at the requested altitude, including reserves (kg)
    pub original_fuel_kg: f64,
    pub optimized_fuel_kg: f64,
    /// Never negative
    pub fuel_savings_kg: f64,
    pub savings_percentage: f64,
    /// Minutes; negative when the recommendation is faster
    pub time_impact_min: i32,
    pub confidence_score: f64,
    pub recommendation_type: RecommendationType,
    pub original_altitude_ft: u32,
    pub recommended_altitude_ft: u32,
    pub rationale: String,
    #[serde(default)]
    pub weather_factors: Vec<String>,
    /// USD
    pub cost_savings: f64,
    pub priority: PriorityClass,
}
