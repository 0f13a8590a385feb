//! Fuel optimization batch runner

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fuelopt_core::{flight_level, AircraftTable, OptimizationEngine, Waypoint, WeatherReading};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fuelopt_workflow::sample::{sample_flights, BatchInput};
use fuelopt_workflow::{
    BatchRunner, Config, InMemoryQueue, InMemoryTopic, Publisher, RunRecordStore,
    SimulatedWeather, StaticWeather, WeatherError, WeatherProvider, WorkflowDeps,
};

/// Supplied readings when the flights file has them, simulated otherwise.
enum BatchWeather {
    Supplied(StaticWeather),
    Simulated(SimulatedWeather),
}

impl WeatherProvider for BatchWeather {
    async fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<WeatherReading>, WeatherError> {
        match self {
            BatchWeather::Supplied(weather) => weather.fetch_readings(waypoints).await,
            BatchWeather::Simulated(weather) => weather.fetch_readings(waypoints).await,
        }
    }
}

/// Optimize a batch of flight plans and publish the recommendations
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with `flights` and optional `weather` (overrides FUELOPT_FLIGHTS_PATH)
    #[arg(long)]
    flights: Option<PathBuf>,

    /// Runs processed in parallel (overrides FUELOPT_MAX_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory for per-flight run records (overrides FUELOPT_RUN_RECORD_DIR)
    #[arg(long)]
    records_dir: Option<PathBuf>,

    /// Seed for simulated weather (overrides FUELOPT_WEATHER_SEED)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("fuelopt_workflow=debug".parse()?))
        .init();

    tracing::info!("Starting fuel optimization batch...");

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(path) = args.flights {
        config.flights_path = Some(path);
    }
    if let Some(concurrency) = args.concurrency.filter(|n| *n > 0) {
        config.max_concurrency = concurrency;
    }
    if let Some(dir) = args.records_dir {
        config.run_record_dir = Some(dir);
    }
    if let Some(seed) = args.seed {
        config.weather_seed = seed;
    }

    let input = match &config.flights_path {
        Some(path) => {
            tracing::info!("Loading flights from {}", path.display());
            BatchInput::load(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load {}: {}", path.display(), e))?
        }
        None => BatchInput {
            flights: sample_flights()?,
            weather: Vec::new(),
        },
    };

    let weather = if input.weather.is_empty() {
        BatchWeather::Simulated(SimulatedWeather::new(config.weather_seed))
    } else {
        BatchWeather::Supplied(StaticWeather::new(input.weather))
    };

    let engine = OptimizationEngine::new(AircraftTable::standard(), config.optimization_rules());
    let queue = InMemoryQueue::new();
    let topic = InMemoryTopic::new();
    let deps = WorkflowDeps::new(engine, weather, Publisher::new(queue.clone(), topic.clone()))
        .with_retry(config.retry_policy())
        .with_stage_timeout(config.stage_timeout);

    let mut runner = BatchRunner::new(Arc::new(deps), config.max_concurrency);
    if let Some(dir) = &config.run_record_dir {
        runner = runner.with_store(RunRecordStore::new(dir));
    }

    tracing::info!(
        "Processing {} flight(s) with concurrency {}",
        input.flights.len(),
        config.max_concurrency
    );
    let outcome = runner.run(input.flights).await;

    for record in &outcome.records {
        match (&record.final_result, &record.last_error) {
            (Some(result), _) => tracing::info!(
                "{}: {} to {}, saves {:.1} kg (${:.2}), priority {}",
                record.flight_id,
                result.recommendation_type.as_str(),
                flight_level(result.recommended_altitude_ft),
                result.fuel_savings_kg,
                result.cost_savings,
                result.priority.as_str()
            ),
            (None, Some(err)) => tracing::warn!("{}: failed: {}", record.flight_id, err),
            (None, None) => tracing::warn!("{}: ended in {}", record.flight_id, record.final_state),
        }
    }

    let summary = &outcome.summary;
    tracing::info!(
        "Summary: {} optimized, {} failed, {:.1} kg saved, ${:.2} saved, \
         {} high priority, avg confidence {:.2}",
        summary.total_flights,
        summary.failed_flights,
        summary.total_fuel_savings_kg,
        summary.total_cost_savings,
        summary.high_priority_recommendations,
        summary.average_confidence
    );
    tracing::info!(
        "Queue holds {} message(s) ({} awaiting acknowledgment), topic {}",
        queue.len(),
        queue.pending().len(),
        topic.len()
    );

    println!("{}", serde_json::to_string_pretty(summary)?);

    Ok(())
}
