//! Workflow state machine and the append-only execution history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Initialized,
    DataIngestion,
    WeatherAnalysis,
    OptimizationCompute,
    RecommendationGeneration,
    ResultsPublication,
    Completed,
    Failed,
}

/// The five stages, in execution order.
pub const STAGES: [WorkflowState; 5] = [
    WorkflowState::DataIngestion,
    WorkflowState::WeatherAnalysis,
    WorkflowState::OptimizationCompute,
    WorkflowState::RecommendationGeneration,
    WorkflowState::ResultsPublication,
];

use WorkflowState::*;

/// Every permitted move. Anything not listed is an invalid transition.
const TRANSITIONS: [(WorkflowState, WorkflowState); 12] = [
    (Initialized, DataIngestion),
    (DataIngestion, WeatherAnalysis),
    (WeatherAnalysis, OptimizationCompute),
    (OptimizationCompute, RecommendationGeneration),
    (RecommendationGeneration, ResultsPublication),
    (ResultsPublication, Completed),
    (Initialized, Failed),
    (DataIngestion, Failed),
    (WeatherAnalysis, Failed),
    (OptimizationCompute, Failed),
    (RecommendationGeneration, Failed),
    (ResultsPublication, Failed),
];

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Completed | Failed)
    }

    pub fn is_stage(self) -> bool {
        STAGES.contains(&self)
    }

    pub fn can_transition_to(self, to: WorkflowState) -> bool {
        TRANSITIONS.contains(&(self, to))
    }

    /// Successor on the happy path.
    pub fn next(self) -> Option<WorkflowState> {
        TRANSITIONS
            .iter()
            .find(|(from, to)| *from == self && *to != Failed)
            .map(|(_, to)| *to)
    }

    /// Check a move against the transition table.
    pub fn transition(self, to: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(WorkflowError::InvalidTransition { from: self, to })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Initialized => "INITIALIZED",
            DataIngestion => "DATA_INGESTION",
            WeatherAnalysis => "WEATHER_ANALYSIS",
            OptimizationCompute => "OPTIMIZATION_COMPUTE",
            RecommendationGeneration => "RECOMMENDATION_GENERATION",
            ResultsPublication => "RESULTS_PUBLICATION",
            Completed => "COMPLETED",
            Failed => "FAILED",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowHistoryEntry {
    pub state: WorkflowState,
    pub timestamp: DateTime<Utc>,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts the stage used; set on completed/failed entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

/// Append-only history owned by a single run.
///
/// Timestamps never go backwards: an entry stamped earlier than its
/// predecessor takes the predecessor's timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowHistory {
    entries: Vec<WorkflowHistoryEntry>,
}

impl WorkflowHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WorkflowHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&WorkflowHistoryEntry> {
        self.entries.last()
    }

    pub fn started(&mut self, state: WorkflowState) {
        self.push(state, HistoryStatus::Started, None, None, None);
    }

    pub fn completed(&mut self, state: WorkflowState, duration: Duration, attempts: u32) {
        self.push(
            state,
            HistoryStatus::Completed,
            Some(duration_ms(duration)),
            None,
            Some(attempts),
        );
    }

    pub fn failed(
        &mut self,
        state: WorkflowState,
        duration: Option<Duration>,
        error: impl Into<String>,
        attempts: u32,
    ) {
        self.push(
            state,
            HistoryStatus::Failed,
            duration.map(duration_ms),
            Some(error.into()),
            Some(attempts),
        );
    }

    /// Number of stages that finished successfully.
    pub fn completed_stages(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == HistoryStatus::Completed)
            .count()
    }

    fn push(
        &mut self,
        state: WorkflowState,
        status: HistoryStatus,
        duration_ms: Option<u64>,
        error: Option<String>,
        attempts: Option<u32>,
    ) {
        let now = Utc::now();
        let timestamp = match self.entries.last() {
            Some(prev) if prev.timestamp > now => prev.timestamp,
            _ => now,
        };
        self.entries.push(WorkflowHistoryEntry {
            state,
            timestamp,
            status,
            duration_ms,
            error,
            attempts,
        });
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Coarse progress view of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub status: RunStatus,
    pub current_state: WorkflowState,
    pub completed_steps: usize,
    pub total_steps: usize,
}

impl WorkflowStatus {
    pub fn of(state: WorkflowState, history: &WorkflowHistory) -> Self {
        let status = match state {
            Initialized if history.is_empty() => RunStatus::NotStarted,
            Completed => RunStatus::Completed,
            Failed => RunStatus::Failed,
            _ => RunStatus::InProgress,
        };
        Self {
            status,
            current_state: state,
            completed_steps: history.completed_stages(),
            total_steps: STAGES.len(),
        }
    }
}
