//! Batch input file format and the built-in demo schedule.

use std::path::Path;

use chrono::{Duration as ChronoDuration, Utc};
use fuelopt_core::{FlightPlan, OptimizationError, Waypoint, WeatherReading};
use serde::{Deserialize, Serialize};

/// Contents of a flights file.
///
/// When `weather` is empty the batch uses the simulated provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchInput {
    pub flights: Vec<FlightPlan>,
    #[serde(default)]
    pub weather: Vec<WeatherReading>,
}

impl BatchInput {
    pub async fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Three representative domestic flights.
pub fn sample_flights() -> Result<Vec<FlightPlan>, OptimizationError> {
    let now = Utc::now();
    Ok(vec![
        FlightPlan {
            flight_id: "AA1234".into(),
            origin: "JFK".into(),
            destination: "LAX".into(),
            aircraft_type: "B737-800".into(),
            departure_time: now + ChronoDuration::hours(2),
            waypoints: vec![
                Waypoint::new("JFK", 40.6413, -73.7781)?,
                Waypoint::new("ORD", 41.9742, -87.9073)?,
                Waypoint::new("DEN", 39.8561, -104.6737)?,
                Waypoint::new("LAX", 33.9416, -118.4085)?,
            ],
            planned_fuel_kg: 18500.0,
            cruise_altitude_ft: 35000,
            passenger_count: 162,
            cargo_weight_kg: 4200.0,
        },
        FlightPlan {
            flight_id: "UA567".into(),
            origin: "ORD".into(),
            destination: "DFW".into(),
            aircraft_type: "A320".into(),
            departure_time: now + ChronoDuration::hours(3),
            waypoints: vec![
                Waypoint::new("ORD", 41.9742, -87.9073)?,
                Waypoint::new("MCI", 39.2976, -94.7139)?,
                Waypoint::new("DFW", 32.8998, -97.0403)?,
            ],
            planned_fuel_kg: 7200.0,
            cruise_altitude_ft: 34000,
            passenger_count: 150,
            cargo_weight_kg: 3000.0,
        },
        FlightPlan {
            flight_id: "DL890".into(),
            origin: "SEA".into(),
            destination: "MIA".into(),
            aircraft_type: "B777-300".into(),
            departure_time: now + ChronoDuration::hours(5),
            waypoints: vec![
                Waypoint::new("SEA", 47.4502, -122.3088)?,
                Waypoint::new("DEN", 39.8561, -104.6737)?,
                Waypoint::new("ATL", 33.6407, -84.4277)?,
                Waypoint::new("MIA", 25.7959, -80.2870)?,
            ],
            planned_fuel_kg: 42000.0,
            cruise_altitude_ft: 37000,
            passenger_count: 320,
            cargo_weight_kg: 12000.0,
        },
    ])
}
