pub mod aircraft;
pub mod altitude;
pub mod confidence;
pub mod engine;
pub mod error;
pub mod fuel;
pub mod models;
pub mod rules;
pub mod spatial;
pub mod summary;

pub use aircraft::{AircraftProfile, AircraftTable};
pub use altitude::{search_altitudes, AltitudeChoice, ALTITUDE_CANDIDATES_FT};
pub use confidence::confidence;
pub use engine::{classify_priority, flight_level, OptimizationEngine};
pub use error::OptimizationError;
pub use fuel::{estimate_fuel, FuelEstimate};
pub use models::{
    FlightPlan, OptimizationResult, PriorityClass, RecommendationType, Waypoint, WeatherReading,
};
pub use rules::OptimizationRules;
pub use spatial::{distance, haversine_distance_nm, route_distance};
pub use summary::BatchSummary;
