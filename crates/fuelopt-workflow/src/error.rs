//! Workflow error taxonomy.
//!
//! Stage failures are classified as transient (retried inside the stage)
//! or fatal (the run moves to FAILED immediately).

use fuelopt_core::OptimizationError;
use thiserror::Error;

use crate::state::WorkflowState;

/// Failure reported by the weather collaborator.
#[derive(Debug, Clone, Error)]
#[error("weather unavailable: {0}")]
pub struct WeatherError(pub String);

/// Failure reported by a delivery channel.
#[derive(Debug, Clone, Error)]
#[error("channel error: {0}")]
pub struct ChannelError(pub String);

/// Which publish destination failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Queue,
    Topic,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Queue => write!(f, "queue"),
            Destination::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Optimization(#[from] OptimizationError),

    #[error("weather unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("{stage} exceeded its {budget_ms} ms budget")]
    StageTimeout { stage: WorkflowState, budget_ms: u128 },

    #[error("publish to {destination} failed: {reason}")]
    PublishFailure {
        destination: Destination,
        reason: String,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Caller error: the state machine does not allow this move.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("{stage} is missing its input: {what}")]
    MissingStageInput {
        stage: WorkflowState,
        what: &'static str,
    },

    #[error("cancelled")]
    Cancelled,
}

impl WorkflowError {
    /// Whether retrying the same stage may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkflowError::WeatherUnavailable(_) | WorkflowError::StageTimeout { .. } => true,
            WorkflowError::PublishFailure { destination, .. } => {
                *destination == Destination::Queue
            }
            _ => false,
        }
    }
}

impl From<WeatherError> for WorkflowError {
    fn from(err: WeatherError) -> Self {
        WorkflowError::WeatherUnavailable(err.0)
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}
