//! Weather collaborator contract and the providers shipped with the workflow.
//!
//! Fetching real observations is someone else's job; the workflow only
//! needs one reading per waypoint, in route order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use chrono::Utc;
use fuelopt_core::{Waypoint, WeatherReading};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::error::WeatherError;

/// Source of per-waypoint weather readings.
pub trait WeatherProvider: Send + Sync {
    /// One reading per waypoint, same order. Failures are retried.
    fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> impl Future<Output = Result<Vec<WeatherReading>, WeatherError>> + Send;
}

/// Serves readings supplied up front, keyed by location.
///
/// Waypoints without a supplied reading get a `WeatherReading::missing`
/// placeholder so the result stays aligned with the route.
#[derive(Debug, Clone, Default)]
pub struct StaticWeather {
    readings: HashMap<String, WeatherReading>,
}

impl StaticWeather {
    pub fn new(readings: impl IntoIterator<Item = WeatherReading>) -> Self {
        Self {
            readings: readings
                .into_iter()
                .map(|r| (r.location.trim().to_ascii_uppercase(), r))
                .collect(),
        }
    }

    pub fn insert(&mut self, reading: WeatherReading) {
        self.readings
            .insert(reading.location.trim().to_ascii_uppercase(), reading);
    }
}

impl WeatherProvider for StaticWeather {
    async fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<WeatherReading>, WeatherError> {
        Ok(waypoints
            .iter()
            .map(|wp| {
                self.readings
                    .get(&wp.name().to_ascii_uppercase())
                    .cloned()
                    .unwrap_or_else(|| WeatherReading::missing(wp.name()))
            })
            .collect())
    }
}

const SIM_WIND_SPEEDS_KT: [f64; 5] = [50.0, 75.0, 100.0, 125.0, 150.0];
const SIM_WIND_DIRECTIONS_DEG: [f64; 4] = [270.0, 280.0, 290.0, 300.0];

/// Seeded generator of plausible westerly upper winds for demos and load runs.
pub struct SimulatedWeather {
    rng: Mutex<StdRng>,
    failure_rate: f64,
}

impl SimulatedWeather {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            failure_rate: 0.0,
        }
    }

    /// Make a fraction of fetches fail as if the upstream service timed out.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    fn generate(&self, waypoints: &[Waypoint]) -> Result<Vec<WeatherReading>, WeatherError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| WeatherError("simulator state poisoned".to_string()))?;

        if rng.random_bool(self.failure_rate) {
            return Err(WeatherError("simulated upstream timeout".to_string()));
        }

        let now = Utc::now();
        Ok(waypoints
            .iter()
            .map(|wp| {
                // Colder toward the poles.
                let base_temp = 15.0 - wp.latitude() / 10.0;
                let temperature_c = base_temp + rng.random_range(-10.0..10.0);
                let wind_speed_kt = *SIM_WIND_SPEEDS_KT.choose(&mut *rng).unwrap_or(&50.0);
                let wind_direction_deg =
                    *SIM_WIND_DIRECTIONS_DEG.choose(&mut *rng).unwrap_or(&270.0);
                WeatherReading {
                    location: wp.name().to_string(),
                    wind_speed_kt,
                    wind_direction_deg,
                    temperature_c: (temperature_c * 10.0).round() / 10.0,
                    altitude_ft: None,
                    observed_at: Some(now),
                    estimated: false,
                }
            })
            .collect())
    }
}

impl WeatherProvider for SimulatedWeather {
    async fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<WeatherReading>, WeatherError> {
        self.generate(waypoints)
    }
}
