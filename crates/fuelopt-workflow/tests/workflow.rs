use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fuelopt_core::{
    FlightPlan, OptimizationEngine, OptimizationError, RecommendationType, Waypoint,
    WeatherReading,
};
use fuelopt_workflow::{
    BatchRunner, ChannelError, HistoryStatus, InMemoryQueue, InMemoryTopic, PublishStatus,
    Publisher, QueueAttributes, QueueChannel, RunRecordStore, RunStatus, StaticWeather,
    TopicAttributes, TopicChannel, WeatherError, WeatherProvider, WorkflowDeps, WorkflowError,
    WorkflowHistory, WorkflowRun, WorkflowState,
};

fn plan(flight_id: &str, aircraft_type: &str) -> FlightPlan {
    FlightPlan {
        flight_id: flight_id.into(),
        origin: "JFK".into(),
        destination: "LAX".into(),
        aircraft_type: aircraft_type.into(),
        departure_time: Utc::now(),
        waypoints: vec![
            Waypoint::new("JFK", 40.6413, -73.7781).unwrap(),
            Waypoint::new("MID", 39.0, -96.0).unwrap(),
            Waypoint::new("LAX", 33.9416, -118.4085).unwrap(),
        ],
        planned_fuel_kg: 15000.0,
        cruise_altitude_ft: 36000,
        passenger_count: 150,
        cargo_weight_kg: 5000.0,
    }
}

/// 125 kt from 080 observed at FL380 over the midpoint.
fn midpoint_tailwind() -> StaticWeather {
    StaticWeather::new([WeatherReading::new("MID", 125.0, 80.0, -56.0).at_altitude(38000)])
}

struct FlakyWeather {
    failures: u32,
    calls: AtomicU32,
    inner: StaticWeather,
}

impl FlakyWeather {
    fn failing(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            inner: midpoint_tailwind(),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WeatherProvider for FlakyWeather {
    async fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<WeatherReading>, WeatherError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(WeatherError("upstream timeout".into()));
        }
        self.inner.fetch_readings(waypoints).await
    }
}

struct SlowWeather;

impl WeatherProvider for SlowWeather {
    async fn fetch_readings(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<WeatherReading>, WeatherError> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(waypoints.iter().map(|wp| WeatherReading::calm(wp.name())).collect())
    }
}

struct FlakyQueue {
    failures: u32,
    calls: AtomicU32,
    delivered: InMemoryQueue,
}

impl FlakyQueue {
    fn failing(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            delivered: InMemoryQueue::new(),
        }
    }
}

impl QueueChannel for FlakyQueue {
    async fn send(
        &self,
        body: String,
        attributes: QueueAttributes,
    ) -> Result<String, ChannelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ChannelError("queue throttled".into()));
        }
        self.delivered.send(body, attributes).await
    }
}

struct DownTopic;

impl TopicChannel for DownTopic {
    async fn publish(
        &self,
        _text: String,
        _subject: String,
        _attributes: TopicAttributes,
    ) -> Result<String, ChannelError> {
        Err(ChannelError("topic unreachable".into()))
    }
}

fn deps<W: WeatherProvider, Q: QueueChannel, T: TopicChannel>(
    weather: W,
    queue: Q,
    topic: T,
) -> Arc<WorkflowDeps<W, Q, T>> {
    Arc::new(WorkflowDeps::new(
        OptimizationEngine::default(),
        weather,
        Publisher::new(queue, topic),
    ))
}

/// Every `started` is closed by its own stage before the next one opens.
fn assert_nested(history: &WorkflowHistory) {
    let mut open: Option<WorkflowState> = None;
    for entry in history.entries() {
        match entry.status {
            HistoryStatus::Started => {
                assert!(open.is_none(), "{} started inside another stage", entry.state);
                open = Some(entry.state);
            }
            HistoryStatus::Completed | HistoryStatus::Failed => match open.take() {
                Some(stage) => assert_eq!(stage, entry.state),
                None => assert_eq!(entry.status, HistoryStatus::Failed),
            },
        }
    }
    assert!(open.is_none());
    assert!(history
        .entries()
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

fn entries_for(
    history: &WorkflowHistory,
    state: WorkflowState,
    status: HistoryStatus,
) -> usize {
    history
        .entries()
        .iter()
        .filter(|e| e.state == state && e.status == status)
        .count()
}

#[tokio::test(start_paused = true)]
async fn tailwind_flight_completes_with_recommendation() {
    let queue = InMemoryQueue::new();
    let topic = InMemoryTopic::new();
    let deps = deps(midpoint_tailwind(), queue.clone(), topic.clone());

    let record = WorkflowRun::new(deps, plan("AA100", "B737-800")).run().await;

    assert_eq!(record.final_state, WorkflowState::Completed);
    assert!(record.last_error.is_none());
    assert_eq!(record.history.len(), 10);
    assert_nested(&record.history);

    let status = record.status();
    assert_eq!(status.status, RunStatus::Completed);
    assert_eq!(status.completed_steps, 5);
    assert_eq!(status.total_steps, 5);

    let result = record.final_result.as_ref().unwrap();
    assert_eq!(result.recommended_altitude_ft, 38000);
    assert_eq!(result.recommendation_type, RecommendationType::RouteModification);
    assert!(result.fuel_savings_kg > 0.0);
    assert!(result.confidence_score >= 0.8);

    let receipt = record.receipt.as_ref().unwrap();
    assert_eq!(receipt.status, PublishStatus::Published);
    assert_eq!(queue.len(), 1);
    assert_eq!(topic.len(), 1);
    assert_eq!(queue.for_flight("AA100").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unobserved_waypoints_lower_confidence() {
    // Only MID is observed; JFK and LAX get placeholders.
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());

    let record = WorkflowRun::new(deps, plan("AA101", "B737-800")).run().await;

    assert_eq!(record.final_state, WorkflowState::Completed);
    let result = record.final_result.as_ref().unwrap();
    let expected = fuelopt_core::confidence(result.savings_percentage, 1.0, 1.0 / 3.0);
    assert!((result.confidence_score - expected).abs() < 1e-9);
    assert!(result.confidence_score < 0.9);
    assert!(result
        .weather_factors
        .iter()
        .any(|f| f == "Dominant wind 125 kt from 080° at MID"));
}

#[tokio::test(start_paused = true)]
async fn weather_succeeding_on_third_attempt_completes_once() {
    let deps = deps(
        FlakyWeather::failing(2),
        InMemoryQueue::new(),
        InMemoryTopic::new(),
    );

    let record = WorkflowRun::new(deps.clone(), plan("AA101", "B737-800"))
        .run()
        .await;

    assert_eq!(record.final_state, WorkflowState::Completed);
    assert_eq!(deps.weather.calls(), 3);
    assert_nested(&record.history);

    let weather = WorkflowState::WeatherAnalysis;
    assert_eq!(entries_for(&record.history, weather, HistoryStatus::Started), 1);
    assert_eq!(entries_for(&record.history, weather, HistoryStatus::Completed), 1);
    assert!(record
        .history
        .entries()
        .iter()
        .all(|e| e.status != HistoryStatus::Failed));

    let completed = record
        .history
        .entries()
        .iter()
        .find(|e| e.state == weather && e.status == HistoryStatus::Completed)
        .unwrap();
    assert_eq!(completed.attempts, Some(3));
    // 2 s + 4 s of backoff on the paused clock
    assert!(completed.duration_ms.unwrap() >= 6000);
}

#[tokio::test(start_paused = true)]
async fn weather_failing_three_times_fails_the_run() {
    let deps = deps(
        FlakyWeather::failing(3),
        InMemoryQueue::new(),
        InMemoryTopic::new(),
    );

    let record = WorkflowRun::new(deps.clone(), plan("AA102", "B737-800"))
        .run()
        .await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert_eq!(deps.weather.calls(), 3);
    assert!(record.final_result.is_none());
    assert!(matches!(record.error, Some(WorkflowError::WeatherUnavailable(_))));
    assert_nested(&record.history);

    let last = record.history.last().unwrap();
    assert_eq!(last.state, WorkflowState::WeatherAnalysis);
    assert_eq!(last.status, HistoryStatus::Failed);
    assert_eq!(last.attempts, Some(3));
    assert_eq!(record.status().status, RunStatus::Failed);
    assert_eq!(record.status().completed_steps, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_aircraft_fails_without_retry() {
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());

    let record = WorkflowRun::new(deps, plan("AA103", "C172")).run().await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(matches!(
        record.error,
        Some(WorkflowError::Optimization(OptimizationError::UnknownAircraft(_)))
    ));
    assert_eq!(record.history.len(), 2);
    let last = record.history.last().unwrap();
    assert_eq!(last.state, WorkflowState::DataIngestion);
    assert_eq!(last.attempts, Some(1));
}

#[tokio::test(start_paused = true)]
async fn impossible_headwind_fails_optimization_stage() {
    let storm = StaticWeather::new(
        ["JFK", "MID", "LAX"].map(|name| WeatherReading::new(name, 1000.0, 270.0, -50.0)),
    );
    let deps = deps(storm, InMemoryQueue::new(), InMemoryTopic::new());

    let record = WorkflowRun::new(deps, plan("AA104", "B737-800")).run().await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(matches!(
        record.error,
        Some(WorkflowError::Optimization(OptimizationError::InvalidWindModel { .. }))
    ));
    let last = record.history.last().unwrap();
    assert_eq!(last.state, WorkflowState::OptimizationCompute);
    assert_eq!(last.attempts, Some(1));
}

#[tokio::test(start_paused = true)]
async fn single_waypoint_route_is_rejected() {
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());
    let mut short = plan("AA105", "B737-800");
    short.waypoints.truncate(1);

    let record = WorkflowRun::new(deps, short).run().await;

    assert!(matches!(
        record.error,
        Some(WorkflowError::Optimization(OptimizationError::InvalidRoute(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_weather_times_out_and_fails() {
    let deps = deps(SlowWeather, InMemoryQueue::new(), InMemoryTopic::new());

    let record = WorkflowRun::new(deps, plan("AA106", "B737-800")).run().await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(matches!(
        record.error,
        Some(WorkflowError::StageTimeout {
            stage: WorkflowState::WeatherAnalysis,
            ..
        })
    ));
    assert_eq!(record.history.last().unwrap().attempts, Some(3));
}

#[tokio::test(start_paused = true)]
async fn topic_outage_still_completes() {
    let queue = InMemoryQueue::new();
    let deps = deps(midpoint_tailwind(), queue.clone(), DownTopic);

    let record = WorkflowRun::new(deps, plan("AA107", "B737-800")).run().await;

    assert_eq!(record.final_state, WorkflowState::Completed);
    let receipt = record.receipt.as_ref().unwrap();
    assert_eq!(receipt.status, PublishStatus::Partial);
    assert_eq!(receipt.channel_message_ids().len(), 1);
    assert_eq!(queue.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn queue_outage_fails_publication_after_retries() {
    let topic = InMemoryTopic::new();
    let deps = deps(midpoint_tailwind(), FlakyQueue::failing(u32::MAX), topic.clone());

    let record = WorkflowRun::new(deps.clone(), plan("AA108", "B737-800"))
        .run()
        .await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(record.final_result.is_none());
    assert!(record.error.as_ref().is_some_and(|e| e.is_transient()));
    let last = record.history.last().unwrap();
    assert_eq!(last.state, WorkflowState::ResultsPublication);
    assert_eq!(last.attempts, Some(3));
    // The topic is attempted alongside every queue attempt.
    assert_eq!(topic.len(), 3);
    assert_eq!(deps.publisher.queue().calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn queue_retry_uses_fresh_message_id() {
    let topic = InMemoryTopic::new();
    let deps = deps(midpoint_tailwind(), FlakyQueue::failing(1), topic.clone());

    let record = WorkflowRun::new(deps.clone(), plan("AA109", "B737-800"))
        .run()
        .await;

    assert_eq!(record.final_state, WorkflowState::Completed);
    assert_eq!(deps.publisher.queue().delivered.len(), 1);
    assert_eq!(topic.len(), 2);
    let publication = record
        .history
        .entries()
        .iter()
        .find(|e| {
            e.state == WorkflowState::ResultsPublication && e.status == HistoryStatus::Completed
        })
        .unwrap();
    assert_eq!(publication.attempts, Some(2));
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_fails_immediately() {
    let deps = deps(
        FlakyWeather::failing(0),
        InMemoryQueue::new(),
        InMemoryTopic::new(),
    );
    let run = WorkflowRun::new(deps.clone(), plan("AA110", "B737-800"));
    run.cancel_handle().cancel();

    let record = run.run().await;

    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(matches!(record.error, Some(WorkflowError::Cancelled)));
    assert_eq!(record.last_error.as_deref(), Some("cancelled"));
    assert_eq!(record.history.len(), 1);
    assert_eq!(record.history.entries()[0].status, HistoryStatus::Failed);
    assert_eq!(deps.weather.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retries() {
    let deps = deps(
        FlakyWeather::failing(u32::MAX),
        InMemoryQueue::new(),
        InMemoryTopic::new(),
    );
    let run = WorkflowRun::new(deps.clone(), plan("AA111", "B737-800"));
    let cancel = run.cancel_handle();
    let task = tokio::spawn(run.run());

    // First attempt fails and the run backs off for 2 s.
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();

    let record = task.await.unwrap();
    assert_eq!(record.final_state, WorkflowState::Failed);
    assert!(matches!(record.error, Some(WorkflowError::Cancelled)));
    assert_eq!(deps.weather.calls(), 1);
    assert_nested(&record.history);
}

#[tokio::test]
async fn terminal_states_reject_transitions() {
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());
    let mut run = WorkflowRun::new(deps, plan("AA112", "B737-800"));

    assert!(matches!(
        run.transition(WorkflowState::Completed),
        Err(WorkflowError::InvalidTransition { .. })
    ));
    run.transition(WorkflowState::Failed).unwrap();
    assert_eq!(run.status().status, RunStatus::Failed);
    assert!(matches!(
        run.transition(WorkflowState::DataIngestion),
        Err(WorkflowError::InvalidTransition {
            from: WorkflowState::Failed,
            to: WorkflowState::DataIngestion
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn batch_keeps_order_and_counts_failures() {
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());
    let runner = BatchRunner::new(deps, 2);

    let outcome = runner
        .run(vec![
            plan("B1", "B737-800"),
            plan("B2", "C172"),
            plan("B3", "A320"),
        ])
        .await;

    let ids: Vec<_> = outcome.records.iter().map(|r| r.flight_id.as_str()).collect();
    assert_eq!(ids, vec!["B1", "B2", "B3"]);
    assert_eq!(outcome.summary.total_flights, 2);
    assert_eq!(outcome.summary.failed_flights, 1);
    assert!(outcome.summary.total_fuel_savings_kg > 0.0);
    assert!(outcome.summary.average_confidence > 0.0);
}

#[tokio::test]
async fn batch_store_writes_a_record_per_flight() {
    let dir = std::env::temp_dir().join(format!("fuelopt-batch-{}", uuid::Uuid::new_v4()));
    let deps = deps(midpoint_tailwind(), InMemoryQueue::new(), InMemoryTopic::new());
    let store = RunRecordStore::new(&dir);
    let runner = BatchRunner::new(deps, 2).with_store(store.clone());

    let outcome = runner
        .run(vec![plan("S1", "B737-800"), plan("S2", "C172"), plan("S3", "A320")])
        .await;
    assert_eq!(outcome.records.len(), 3);

    for flight_id in ["S1", "S2", "S3"] {
        assert!(dir.join(format!("{flight_id}.json")).exists(), "{flight_id}");
        let saved = store.load(flight_id).await.unwrap().unwrap();
        assert_eq!(saved.flight_id, flight_id);
    }
    let failed = store.load("S2").await.unwrap().unwrap();
    assert_eq!(failed.final_state, WorkflowState::Failed);
    assert!(failed.final_result.is_none());

    std::fs::remove_dir_all(&dir).unwrap();
}
