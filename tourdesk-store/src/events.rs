use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tourdesk_core::{NotificationDispatcher, NotificationError};
use tourdesk_shared::BookingCreatedEvent;
use tracing::{error, info};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Published {} to {}: partition {} offset {}",
                    key, topic, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to publish {} to {}: {}", key, topic, e);
                Err(e)
            }
        }
    }
}

/// Hands `booking.created` events to the notification consumers over Kafka.
/// Keyed by booking reference so retries of one booking stay ordered.
pub struct KafkaDispatcher {
    producer: EventProducer,
    topic: String,
}

impl KafkaDispatcher {
    pub fn new(producer: EventProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for KafkaDispatcher {
    async fn notify_booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(event)?;
        self.producer
            .publish(&self.topic, &event.booking_reference, &payload)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }
}
