//! Publisher contract: one recommendation, two destinations.
//!
//! The durable queue is the operational source of truth; the broadcast
//! topic is informational. Both are always attempted and both outcomes
//! are reported, so a failure on one never hides the other's result.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChannelError, WorkflowError};
use crate::recommendation::RecommendationMessage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAttributes {
    pub priority: u8,
    pub flight_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAttributes {
    pub priority: u8,
}

/// Durable, at-least-once queue. Returns the channel's message id.
pub trait QueueChannel: Send + Sync {
    fn send(
        &self,
        body: String,
        attributes: QueueAttributes,
    ) -> impl Future<Output = Result<String, ChannelError>> + Send;
}

/// Broadcast topic for human-readable notifications.
pub trait TopicChannel: Send + Sync {
    fn publish(
        &self,
        text: String,
        subject: String,
        attributes: TopicAttributes,
    ) -> impl Future<Output = Result<String, ChannelError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { channel_message_id: String },
    Failed { reason: String },
}

impl DeliveryOutcome {
    fn from_result(result: Result<String, ChannelError>) -> Self {
        match result {
            Ok(channel_message_id) => DeliveryOutcome::Delivered { channel_message_id },
            Err(err) => DeliveryOutcome::Failed { reason: err.0 },
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn channel_message_id(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered { channel_message_id } => Some(channel_message_id),
            DeliveryOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Failed { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Both destinations accepted the message
    Published,
    /// Exactly one destination accepted it
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub message_id: Uuid,
    pub queue: DeliveryOutcome,
    pub topic: DeliveryOutcome,
    pub status: PublishStatus,
}

impl PublishReceipt {
    fn new(message_id: Uuid, queue: DeliveryOutcome, topic: DeliveryOutcome) -> Self {
        let status = match (queue.is_delivered(), topic.is_delivered()) {
            (true, true) => PublishStatus::Published,
            (false, false) => PublishStatus::Failed,
            _ => PublishStatus::Partial,
        };
        Self {
            message_id,
            queue,
            topic,
            status,
        }
    }

    /// Ids assigned by the channels that accepted the message, queue first.
    pub fn channel_message_ids(&self) -> Vec<String> {
        [&self.queue, &self.topic]
            .into_iter()
            .filter_map(|outcome| outcome.channel_message_id().map(str::to_string))
            .collect()
    }
}

/// Fans a message out to the queue and the topic.
#[derive(Debug, Clone)]
pub struct Publisher<Q, T> {
    queue: Q,
    topic: T,
}

impl<Q: QueueChannel, T: TopicChannel> Publisher<Q, T> {
    pub fn new(queue: Q, topic: T) -> Self {
        Self { queue, topic }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn topic(&self) -> &T {
        &self.topic
    }

    /// Deliver `message` to both destinations.
    ///
    /// Only serialization errors are returned as `Err`; delivery failures
    /// are reported per destination in the receipt. Safe to call again for
    /// the same message.
    pub async fn publish(
        &self,
        message: &RecommendationMessage,
    ) -> Result<PublishReceipt, WorkflowError> {
        let body = serde_json::to_string(message)?;
        let queue_attributes = QueueAttributes {
            priority: message.priority,
            flight_id: message.flight_id.clone(),
        };
        let topic_attributes = TopicAttributes {
            priority: message.priority,
        };

        let (queued, broadcast) = tokio::join!(
            self.queue.send(body, queue_attributes),
            self.topic
                .publish(message.text_summary(), message.subject(), topic_attributes),
        );

        Ok(PublishReceipt::new(
            message.message_id,
            DeliveryOutcome::from_result(queued),
            DeliveryOutcome::from_result(broadcast),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub body: String,
    pub attributes: QueueAttributes,
    pub enqueued_at: DateTime<Utc>,
    pub acknowledged: bool,
}

/// Process-local queue that keeps every delivered message until acknowledged.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    messages: Arc<DashMap<String, QueuedMessage>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<QueuedMessage> {
        self.messages.get(id).map(|entry| entry.value().clone())
    }

    /// Mark a delivered message as handled. Returns false for unknown ids.
    pub fn acknowledge(&self, id: &str) -> bool {
        match self.messages.get_mut(id) {
            Some(mut entry) => {
                entry.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Unacknowledged messages, oldest first.
    pub fn pending(&self) -> Vec<(String, QueuedMessage)> {
        let mut pending: Vec<_> = self
            .messages
            .iter()
            .filter(|entry| !entry.acknowledged)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        pending.sort_by_key(|(_, message)| message.enqueued_at);
        pending
    }

    /// Messages sent for one flight.
    pub fn for_flight(&self, flight_id: &str) -> Vec<QueuedMessage> {
        self.messages
            .iter()
            .filter(|entry| entry.attributes.flight_id == flight_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl QueueChannel for InMemoryQueue {
    async fn send(
        &self,
        body: String,
        attributes: QueueAttributes,
    ) -> Result<String, ChannelError> {
        let id = Uuid::new_v4().to_string();
        self.messages.insert(
            id.clone(),
            QueuedMessage {
                body,
                attributes,
                enqueued_at: Utc::now(),
                acknowledged: false,
            },
        );
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMessage {
    pub subject: String,
    pub text: String,
    pub attributes: TopicAttributes,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTopic {
    messages: Arc<DashMap<String, TopicMessage>>,
}

impl InMemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|entry| entry.subject.clone())
            .collect()
    }
}

impl TopicChannel for InMemoryTopic {
    async fn publish(
        &self,
        text: String,
        subject: String,
        attributes: TopicAttributes,
    ) -> Result<String, ChannelError> {
        let id = Uuid::new_v4().to_string();
        self.messages.insert(
            id.clone(),
            TopicMessage {
                subject,
                text,
                attributes,
            },
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::RecommendationFormatter;
    use fuelopt_core::{OptimizationResult, PriorityClass, RecommendationType};

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

    fn message(priority: PriorityClass) -> RecommendationMessage {
        let result = OptimizationResult {
            flight_id: "UA200".into(),
            original_fuel_kg: 9000.0,
            optimized_fuel_kg: 8500.0,
            fuel_savings_kg: 500.0,
            savings_percentage: 5.56,
            time_impact_min: 2,
            confidence_score: 0.95,
            recommendation_type: RecommendationType::AltitudeOptimization,
            original_altitude_ft: 32000,
            recommended_altitude_ft: 38000,
            rationale: "Altitude change from FL320 to FL380 optimizes fuel efficiency".into(),
            weather_factors: Vec::new(),
            cost_savings: 425.0,
            priority,
        };
        RecommendationFormatter::default().format(&result)
    }

    #[tokio::test]
    async fn publishes_to_both_destinations() {
        let publisher = Publisher::new(InMemoryQueue::new(), InMemoryTopic::new());
        let message = message(PriorityClass::High);

        let receipt = publisher.publish(&message).await.unwrap();

        assert_eq!(receipt.status, PublishStatus::Published);
        assert_eq!(receipt.message_id, message.message_id);
        let ids = receipt.channel_message_ids();
        assert_eq!(ids.len(), 2);

        let queued = publisher.queue().get(&ids[0]).unwrap();
        assert_eq!(queued.attributes.priority, 9);
        assert_eq!(queued.attributes.flight_id, "UA200");
        let decoded: RecommendationMessage = serde_json::from_str(&queued.body).unwrap();
        assert_eq!(decoded.message_id, message.message_id);
        assert_eq!(decoded.payload.implementation_steps, message.payload.implementation_steps);
        assert!(decoded.requires_acknowledgment);

        assert_eq!(
            publisher.topic().subjects(),
            vec!["Fuel optimization: UA200 (HIGH)".to_string()]
        );
    }

    #[tokio::test]
    async fn topic_failure_keeps_queue_result() {
        let publisher = Publisher::new(InMemoryQueue::new(), DownTopic);
        let receipt = publisher.publish(&message(PriorityClass::Low)).await.unwrap();

        assert_eq!(receipt.status, PublishStatus::Partial);
        assert!(receipt.queue.is_delivered());
        assert_eq!(receipt.topic.failure_reason(), Some("topic unreachable"));
        assert_eq!(publisher.queue().len(), 1);
    }

    #[tokio::test]
    async fn publishing_twice_is_tolerated() {
        let publisher = Publisher::new(InMemoryQueue::new(), InMemoryTopic::new());
        let message = message(PriorityClass::Medium);

        let first = publisher.publish(&message).await.unwrap();
        let second = publisher.publish(&message).await.unwrap();

        assert_eq!(first.message_id, second.message_id);
        assert_eq!(publisher.queue().for_flight("UA200").len(), 2);
    }

    #[tokio::test]
    async fn acknowledged_messages_leave_pending() {
        let queue = InMemoryQueue::new();
        let id = queue
            .send(
                "{}".into(),
                QueueAttributes {
                    priority: 9,
                    flight_id: "UA200".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(queue.pending().len(), 1);
        assert!(queue.acknowledge(&id));
        assert!(queue.pending().is_empty());
        assert!(!queue.acknowledge("missing"));
    }
}
