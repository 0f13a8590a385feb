//! Errors raised by the optimization engine.
//!
//! Every variant here is a data or contract problem: retrying the same
//! input cannot make it succeed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationError {
    /// Route has fewer than two waypoints.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// Latitude/longitude outside the valid range.
    #[error("invalid coordinate for {name}: lat {lat}, lon {lon}")]
    InvalidCoordinate { name: String, lat: f64, lon: f64 },

    #[error("invalid flight plan {flight_id}: {reason}")]
    InvalidFlightPlan { flight_id: String, reason: String },

    #[error("aircraft type {0} is not in the performance table")]
    UnknownAircraft(String),

    /// Wind impact drove the ground speed to zero or below.
    #[error("invalid wind model at {altitude_ft} ft: ground speed {ground_speed_kt:.1} kt")]
    InvalidWindModel {
        altitude_ft: u32,
        ground_speed_kt: f64,
    },
}

pub type Result<T> = std::result::Result<T, OptimizationError>;
