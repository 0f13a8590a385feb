//! Per-flight optimization workflow: stage orchestration, retries,
//! recommendation formatting and publishing.

pub mod backoff;
pub mod batch;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod persistence;
pub mod publish;
pub mod recommendation;
pub mod sample;
pub mod state;
pub mod weather;

pub use backoff::{Backoff, RetryPolicy};
pub use batch::{BatchOutcome, BatchRunner};
pub use config::Config;
pub use error::{ChannelError, Destination, WeatherError, WorkflowError};
pub use orchestrator::{CancelHandle, RunRecord, WorkflowDeps, WorkflowRun};
pub use persistence::RunRecordStore;
pub use publish::{
    DeliveryOutcome, InMemoryQueue, InMemoryTopic, PublishReceipt, PublishStatus, Publisher,
    QueueAttributes, QueueChannel, TopicAttributes, TopicChannel,
};
pub use recommendation::{PriorityTable, RecommendationFormatter, RecommendationMessage};
pub use state::{HistoryStatus, RunStatus, WorkflowHistory, WorkflowState, WorkflowStatus};
pub use weather::{SimulatedWeather, StaticWeather, WeatherProvider};
