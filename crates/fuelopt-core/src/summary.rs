//! Aggregate statistics over a batch of optimized flights.

use serde::{Deserialize, Serialize};

use crate::models::{OptimizationResult, PriorityClass};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_flights: usize,
    /// Runs that ended without a result; not part of the other totals.
    pub failed_flights: usize,
    pub total_fuel_savings_kg: f64,
    pub total_cost_savings: f64,
    pub high_priority_recommendations: usize,
    pub average_confidence: f64,
}

impl BatchSummary {
    /// Fold completed results into a summary.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a OptimizationResult>) -> Self {
        let mut summary = BatchSummary::default();
        let mut confidence_sum = 0.0;

        for result in results {
            summary.total_flights += 1;
            summary.total_fuel_savings_kg += result.fuel_savings_kg;
            summary.total_cost_savings += result.cost_savings;
            if result.priority == PriorityClass::High {
                summary.high_priority_recommendations += 1;
            }
            confidence_sum += result.confidence_score;
        }

        if summary.total_flights > 0 {
            summary.average_confidence = confidence_sum / summary.total_flights as f64;
        }
        summary
    }

    pub fn with_failures(mut self, failed_flights: usize) -> Self {
        self.failed_flights = failed_flights;
        self
    }
}
