//! Workflow configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fuelopt_core::OptimizationRules;

use crate::backoff::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub fuel_price_per_kg: f64,
    /// Runs processed in parallel by the batch runner
    pub max_concurrency: usize,
    /// Wall-clock budget for the weather and publish stages
    pub stage_timeout: Duration,
    pub retry_initial_interval: Duration,
    /// Where run records are written; `None` disables persistence
    pub run_record_dir: Option<PathBuf>,
    /// JSON file of flight plans; `None` uses the built-in sample
    pub flights_path: Option<PathBuf>,
    pub weather_seed: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            fuel_price_per_kg: env::var("FUELOPT_FUEL_PRICE_PER_KG")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|price: &f64| price.is_finite() && *price >= 0.0)
                .unwrap_or(0.85),
            max_concurrency: env::var("FUELOPT_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
            stage_timeout: Duration::from_secs(
                env::var("FUELOPT_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            retry_initial_interval: Duration::from_secs(
                env::var("FUELOPT_RETRY_BASE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            run_record_dir: env::var("FUELOPT_RUN_RECORD_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            flights_path: env::var("FUELOPT_FLIGHTS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            weather_seed: env::var("FUELOPT_WEATHER_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(42),
        }
    }

    pub fn optimization_rules(&self) -> OptimizationRules {
        OptimizationRules {
            fuel_price_per_kg: self.fuel_price_per_kg,
            ..OptimizationRules::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_initial_interval(self.retry_initial_interval)
    }
}
