//! Per-flight workflow run.
//!
//! A `WorkflowRun` drives one flight through the five stages in order,
//! retrying transient stage failures with exponential backoff and
//! recording every stage in an append-only history. Runs share nothing
//! mutable; batch processing is many runs over one `WorkflowDeps`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fuelopt_core::{FlightPlan, OptimizationEngine, OptimizationResult, WeatherReading};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::Instrument;

use crate::backoff::RetryPolicy;
use crate::error::{Destination, WorkflowError};
use crate::publish::{PublishReceipt, PublishStatus, Publisher, QueueChannel, TopicChannel};
use crate::recommendation::{RecommendationFormatter, RecommendationMessage};
use crate::state::{WorkflowHistory, WorkflowState, WorkflowStatus};
use crate::weather::WeatherProvider;

/// Collaborators and policies shared by every run.
pub struct WorkflowDeps<W, Q, T> {
    pub engine: OptimizationEngine,
    pub weather: W,
    pub publisher: Publisher<Q, T>,
    pub formatter: RecommendationFormatter,
    pub retry: RetryPolicy,
    /// Wall-clock budget per attempt of the weather and publish stages
    pub stage_timeout: Duration,
}

impl<W, Q, T> WorkflowDeps<W, Q, T>
where
    W: WeatherProvider,
    Q: QueueChannel,
    T: TopicChannel,
{
    pub fn new(engine: OptimizationEngine, weather: W, publisher: Publisher<Q, T>) -> Self {
        Self {
            engine,
            weather,
            publisher,
            formatter: RecommendationFormatter::default(),
            retry: RetryPolicy::default(),
            stage_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn with_formatter(mut self, formatter: RecommendationFormatter) -> Self {
        self.formatter = formatter;
        self
    }
}

/// Marks a run cancelled; checked before each stage and after each backoff.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outputs accumulated by the stages so far.
#[derive(Debug, Default)]
struct StageData {
    plan: Option<FlightPlan>,
    readings: Option<Vec<WeatherReading>>,
    result: Option<OptimizationResult>,
    message: Option<RecommendationMessage>,
    receipt: Option<PublishReceipt>,
}

/// What a finished run leaves behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub flight_id: String,
    pub history: WorkflowHistory,
    pub final_result: Option<OptimizationResult>,
    pub final_state: WorkflowState,
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<PublishReceipt>,
    #[serde(skip)]
    pub error: Option<WorkflowError>,
}

impl RunRecord {
    pub fn status(&self) -> WorkflowStatus {
        WorkflowStatus::of(self.final_state, &self.history)
    }

    pub fn is_completed(&self) -> bool {
        self.final_state == WorkflowState::Completed
    }
}

pub struct WorkflowRun<W, Q, T> {
    deps: Arc<WorkflowDeps<W, Q, T>>,
    input: FlightPlan,
    state: WorkflowState,
    history: WorkflowHistory,
    data: StageData,
    cancel: CancelHandle,
    last_error: Option<WorkflowError>,
}

impl<W, Q, T> WorkflowRun<W, Q, T>
where
    W: WeatherProvider,
    Q: QueueChannel,
    T: TopicChannel,
{
    pub fn new(deps: Arc<WorkflowDeps<W, Q, T>>, plan: FlightPlan) -> Self {
        Self {
            deps,
            input: plan,
            state: WorkflowState::Initialized,
            history: WorkflowHistory::new(),
            data: StageData::default(),
            cancel: CancelHandle::default(),
            last_error: None,
        }
    }

    pub fn flight_id(&self) -> &str {
        &self.input.flight_id
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn history(&self) -> &WorkflowHistory {
        &self.history
    }

    pub fn status(&self) -> WorkflowStatus {
        WorkflowStatus::of(self.state, &self.history)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Move the state machine; terminal states reject every move.
    pub fn transition(&mut self, to: WorkflowState) -> Result<(), WorkflowError> {
        self.state = self.state.transition(to)?;
        Ok(())
    }

    /// Drive the run to a terminal state and hand back its record.
    pub async fn run(mut self) -> RunRecord {
        let span = tracing::info_span!("workflow_run", flight_id = %self.input.flight_id);
        self.drive().instrument(span).await;
        self.into_record()
    }

    async fn drive(&mut self) {
        while let Some(next) = self.state.next() {
            if !next.is_stage() {
                if let Err(err) = self.transition(next) {
                    self.last_error = Some(err);
                }
                tracing::info!("Workflow completed");
                return;
            }

            if self.cancel.is_cancelled() {
                tracing::warn!("Run cancelled before {}", next);
                self.fail(next, None, WorkflowError::Cancelled, 0);
                return;
            }

            if let Err(err) = self.transition(next) {
                self.last_error = Some(err);
                return;
            }
            if self.execute(next).await.is_err() {
                return;
            }
        }
    }

    /// Run one stage to success or to FAILED.
    async fn execute(&mut self, stage: WorkflowState) -> Result<(), WorkflowError> {
        self.history.started(stage);
        tracing::info!("{} started", stage);

        let started_at = Instant::now();
        let mut backoff = self.deps.retry.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let err = match self.attempt(stage, attempts).await {
                Ok(()) => {
                    let elapsed = started_at.elapsed();
                    self.history.completed(stage, elapsed, attempts);
                    tracing::info!(
                        "{} completed in {:?} after {} attempt(s)",
                        stage,
                        elapsed,
                        attempts
                    );
                    return Ok(());
                }
                Err(err) => err,
            };

            let delay = if err.is_transient() { backoff.fail() } else { None };
            let Some(delay) = delay else {
                tracing::error!("{} failed after {} attempt(s): {}", stage, attempts, err);
                self.fail(stage, Some(started_at.elapsed()), err.clone(), attempts);
                return Err(err);
            };

            tracing::warn!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "{} attempt failed, retrying: {}",
                stage,
                err
            );
            tokio::time::sleep(delay).await;

            if self.cancel.is_cancelled() {
                tracing::warn!("Run cancelled while retrying {}", stage);
                let err = WorkflowError::Cancelled;
                self.fail(stage, Some(started_at.elapsed()), err.clone(), attempts);
                return Err(err);
            }
        }
    }

    async fn attempt(&mut self, stage: WorkflowState, attempt: u32) -> Result<(), WorkflowError> {
        let budget = self.deps.stage_timeout;
        match stage {
            WorkflowState::DataIngestion => {
                let plan = self.input.normalized();
                self.deps.engine.validate(&plan)?;
                self.data.plan = Some(plan);
            }
            WorkflowState::WeatherAnalysis => {
                let plan = require(stage, self.data.plan.as_ref(), "flight plan")?;
                let readings = within_budget(
                    stage,
                    budget,
                    self.deps.weather.fetch_readings(&plan.waypoints),
                )
                .await??;
                if readings.len() != plan.waypoints.len() {
                    tracing::debug!(
                        "Weather returned {} reading(s) for {} waypoint(s)",
                        readings.len(),
                        plan.waypoints.len()
                    );
                }
                self.data.readings = Some(readings);
            }
            WorkflowState::OptimizationCompute => {
                let plan = require(stage, self.data.plan.as_ref(), "flight plan")?;
                let readings = require(stage, self.data.readings.as_ref(), "weather readings")?;
                let result = self.deps.engine.optimize(plan, readings)?;
                tracing::debug!(
                    "Best altitude {} ft, savings {:.1} kg",
                    result.recommended_altitude_ft,
                    result.fuel_savings_kg
                );
                self.data.result = Some(result);
            }
            WorkflowState::RecommendationGeneration => {
                let result = require(stage, self.data.result.as_ref(), "optimization result")?;
                self.data.message = Some(self.deps.formatter.format(result));
            }
            WorkflowState::ResultsPublication => {
                // Every publish attempt carries its own message id.
                if attempt > 1 {
                    let result = require(stage, self.data.result.as_ref(), "optimization result")?;
                    self.data.message = Some(self.deps.formatter.format(result));
                }
                let message = require(stage, self.data.message.as_ref(), "recommendation")?;
                let receipt =
                    within_budget(stage, budget, self.deps.publisher.publish(message)).await??;
                check_receipt(&receipt)?;
                self.data.receipt = Some(receipt);
            }
            WorkflowState::Initialized | WorkflowState::Completed | WorkflowState::Failed => {
                return Err(WorkflowError::InvalidTransition {
                    from: self.state,
                    to: stage,
                });
            }
        }
        Ok(())
    }

    fn fail(
        &mut self,
        stage: WorkflowState,
        elapsed: Option<Duration>,
        err: WorkflowError,
        attempts: u32,
    ) {
        self.history.failed(stage, elapsed, err.to_string(), attempts);
        if let Err(transition_err) = self.transition(WorkflowState::Failed) {
            tracing::error!("Could not mark run failed: {}", transition_err);
        }
        self.last_error = Some(err);
    }

    fn into_record(self) -> RunRecord {
        let final_result = if self.state == WorkflowState::Completed {
            self.data.result
        } else {
            None
        };
        RunRecord {
            flight_id: self.input.flight_id,
            history: self.history,
            final_result,
            final_state: self.state,
            last_error: self.last_error.as_ref().map(ToString::to_string),
            receipt: self.data.receipt,
            error: self.last_error,
        }
    }
}

fn require<'a, V>(
    stage: WorkflowState,
    value: Option<&'a V>,
    what: &'static str,
) -> Result<&'a V, WorkflowError> {
    value.ok_or(WorkflowError::MissingStageInput { stage, what })
}

async fn within_budget<F: Future>(
    stage: WorkflowState,
    budget: Duration,
    fut: F,
) -> Result<F::Output, WorkflowError> {
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| WorkflowError::StageTimeout {
            stage,
            budget_ms: budget.as_millis(),
        })
}

/// Queue failure fails the stage; topic failure is only logged.
fn check_receipt(receipt: &PublishReceipt) -> Result<(), WorkflowError> {
    if let Some(reason) = receipt.queue.failure_reason() {
        return Err(WorkflowError::PublishFailure {
            destination: Destination::Queue,
            reason: reason.to_string(),
        });
    }
    if receipt.status == PublishStatus::Partial {
        if let Some(reason) = receipt.topic.failure_reason() {
            tracing::warn!("Topic delivery failed, queue delivery stands: {}", reason);
        }
    }
    Ok(())
}
