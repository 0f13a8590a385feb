//! Turns an optimization result into a prioritized, acknowledgeable message.

use chrono::{DateTime, Utc};
use fuelopt_core::{flight_level, OptimizationResult, PriorityClass, RecommendationType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MESSAGE_TYPE: &str = "fuel_optimization_recommendation";

const MIN_PRIORITY: u8 = 1;
const MAX_PRIORITY: u8 = 10;

/// Integer priority for each engine classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
    pub unclassified: u8,
    /// Messages at or above this priority must be acknowledged
    pub acknowledgment_threshold: u8,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            low: 3,
            medium: 6,
            high: 9,
            unclassified: 5,
            acknowledgment_threshold: 7,
        }
    }
}

impl PriorityTable {
    pub fn score(&self, class: PriorityClass) -> u8 {
        let raw = match class {
            PriorityClass::Low => self.low,
            PriorityClass::Medium => self.medium,
            PriorityClass::High => self.high,
            PriorityClass::Unclassified => self.unclassified,
        };
        raw.clamp(MIN_PRIORITY, MAX_PRIORITY)
    }

    pub fn requires_acknowledgment(&self, priority: u8) -> bool {
        priority >= self.acknowledgment_threshold
    }
}

/// Everything the operations team needs to act on; no ids or timestamps,
/// so the same result always yields the same payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    pub result: OptimizationResult,
    pub action_required: String,
    pub implementation_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMessage {
    pub message_id: Uuid,
    pub message_type: String,
    pub flight_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: RecommendationPayload,
    /// 1-10, 10 being highest
    pub priority: u8,
    pub requires_acknowledgment: bool,
}

impl RecommendationMessage {
    pub fn priority_class(&self) -> PriorityClass {
        self.payload.result.priority
    }

    pub fn subject(&self) -> String {
        format!(
            "Fuel optimization: {} ({})",
            self.flight_id,
            self.priority_class().as_str().to_ascii_uppercase()
        )
    }

    /// Plain-text rendering for the broadcast topic.
    pub fn text_summary(&self) -> String {
        let result = &self.payload.result;
        let rule = "=".repeat(50);

        let considerations = if result.weather_factors.is_empty() {
            "- None".to_string()
        } else {
            result
                .weather_factors
                .iter()
                .map(|f| format!("- {f}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "FUEL OPTIMIZATION RECOMMENDATION\n{rule}\n\n\
             Flight: {flight}\n\
             Priority: {priority} ({score}/10)\n\
             Generated: {generated}\n\n\
             RECOMMENDATION\n--------------\n\
             Type: {kind}\n\
             Action Required: {action}\n\
             Rationale: {rationale}\n\n\
             EXPECTED BENEFITS\n-----------------\n\
             Fuel Savings: {fuel:.1} kg ({pct:.2}%)\n\
             Cost Savings: ${cost:.2} USD\n\
             Time Impact: {time:+} minutes\n\
             Confidence: {confidence:.0}%\n\n\
             WEATHER CONSIDERATIONS\n----------------------\n\
             {considerations}\n\n\
             IMPLEMENTATION STEPS\n--------------------\n\
             {steps}\n\n\
             This is an automated recommendation. \
             Please coordinate with dispatch before implementation.\n",
            flight = self.flight_id,
            priority = self.priority_class().as_str().to_ascii_uppercase(),
            score = self.priority,
            generated = self.timestamp.format("%Y-%m-%d %H:%M UTC"),
            kind = title_case(result.recommendation_type.as_str()),
            action = self.payload.action_required,
            rationale = result.rationale,
            fuel = result.fuel_savings_kg,
            pct = result.savings_percentage,
            cost = result.cost_savings,
            time = result.time_impact_min,
            confidence = result.confidence_score * 100.0,
            steps = self.payload.implementation_steps.join("\n"),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationFormatter {
    table: PriorityTable,
}

impl RecommendationFormatter {
    pub fn new(table: PriorityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PriorityTable {
        &self.table
    }

    /// Build a fresh message for `result`.
    pub fn format(&self, result: &OptimizationResult) -> RecommendationMessage {
        let priority = self.table.score(result.priority);
        RecommendationMessage {
            message_id: Uuid::new_v4(),
            message_type: MESSAGE_TYPE.to_string(),
            flight_id: result.flight_id.clone(),
            timestamp: Utc::now(),
            payload: RecommendationPayload {
                result: result.clone(),
                action_required: action_required(result),
                implementation_steps: implementation_steps(result),
            },
            priority,
            requires_acknowledgment: self.table.requires_acknowledgment(priority),
        }
    }
}

pub fn action_required(result: &OptimizationResult) -> String {
    match result.recommendation_type {
        RecommendationType::AltitudeOptimization => format!(
            "Request altitude change to {} for {:.0}kg fuel savings",
            flight_level(result.recommended_altitude_ft),
            result.fuel_savings_kg
        ),
        RecommendationType::RouteModification => format!(
            "Review route amendment to {} for {:.0}kg fuel savings",
            flight_level(result.recommended_altitude_ft),
            result.fuel_savings_kg
        ),
        RecommendationType::NoChange => format!(
            "No action required; maintain {}",
            flight_level(result.original_altitude_ft)
        ),
    }
}

pub fn implementation_steps(result: &OptimizationResult) -> Vec<String> {
    let level = flight_level(result.recommended_altitude_ft);
    let steps: Vec<String> = match result.recommendation_type {
        RecommendationType::AltitudeOptimization => vec![
            "Review current flight plan and fuel calculations".into(),
            format!("Request altitude change to {level} from ATC"),
            "Update FMS with new cruise altitude".into(),
            "Monitor fuel consumption after altitude change".into(),
            "Report actual savings to operations".into(),
        ],
        RecommendationType::RouteModification => vec![
            "Review proposed route modifications".into(),
            "Verify route changes with dispatch".into(),
            format!("Submit route amendment with cruise at {level} to ATC"),
            "Update FMS with amended route".into(),
            "Monitor progress and fuel consumption".into(),
        ],
        RecommendationType::NoChange => vec![
            "Review optimization summary".into(),
            "Continue with filed flight plan".into(),
        ],
    };
    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect()
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
