//! Many independent runs under a concurrency limit.

use std::sync::Arc;

use fuelopt_core::{BatchSummary, FlightPlan};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::orchestrator::{RunRecord, WorkflowDeps, WorkflowRun};
use crate::persistence::RunRecordStore;
use crate::publish::{QueueChannel, TopicChannel};
use crate::weather::WeatherProvider;

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One record per submitted plan, in submission order
    pub records: Vec<RunRecord>,
    pub summary: BatchSummary,
}

pub struct BatchRunner<W, Q, T> {
    deps: Arc<WorkflowDeps<W, Q, T>>,
    max_concurrency: usize,
    store: Option<RunRecordStore>,
}

impl<W, Q, T> BatchRunner<W, Q, T>
where
    W: WeatherProvider + 'static,
    Q: QueueChannel + 'static,
    T: TopicChannel + 'static,
{
    pub fn new(deps: Arc<WorkflowDeps<W, Q, T>>, max_concurrency: usize) -> Self {
        Self {
            deps,
            max_concurrency: max_concurrency.max(1),
            store: None,
        }
    }

    pub fn with_store(mut self, store: RunRecordStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Run every plan to a terminal state and summarize the completed ones.
    pub async fn run(&self, plans: Vec<FlightPlan>) -> BatchOutcome {
        let total = plans.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, plan) in plans.into_iter().enumerate() {
            let deps = self.deps.clone();
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let record = WorkflowRun::new(deps, plan).run().await;
                if let Some(store) = &store {
                    if let Err(err) = store.save(&record).await {
                        tracing::warn!(
                            "Failed to persist run record for {}: {}",
                            record.flight_id,
                            err
                        );
                    }
                }
                (index, record)
            });
        }

        let mut indexed = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => indexed.push(entry),
                Err(err) => tracing::error!("Workflow task aborted: {}", err),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let records: Vec<RunRecord> = indexed.into_iter().map(|(_, record)| record).collect();

        let completed = records.iter().filter(|r| r.is_completed()).count();
        let summary = BatchSummary::from_results(
            records.iter().filter_map(|record| record.final_result.as_ref()),
        )
        .with_failures(total - completed);

        tracing::info!(
            "Batch finished: {} completed, {} failed",
            completed,
            summary.failed_flights
        );

        BatchOutcome { records, summary }
    }
}
