use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::model::RefEntity;

/// Delivery status of an outbox event.
///
/// Transitions: `Pending → Processing → {Processed | Pending (retry) |
/// Failed}`. `Processing` doubles as a lease: a row stuck there past its
/// `leased_until` is requeued by the recovery sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Failed,
}

/// Durable at-least-once delivery obligation, written in the same commit as
/// the entity change it describes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    /// JSON envelope, ready for the transport.
    pub payload: String,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Failed delivery attempts so far.
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub claimed_by: Option<String>,
    pub leased_until: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    pub fn new(
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        OutboxRecord {
            id: Uuid::new_v4(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            payload: payload.into(),
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            retry_count: 0,
            error_message: None,
            claimed_by: None,
            leased_until: None,
        }
    }

    /// Build a record for an entity change, with the envelope payload
    /// (`eventId`, `eventType`, `aggregateId`, `aggregateType`, `timestamp`
    /// plus the entity's own fields) serialized to JSON.
    pub fn domain_event<T: RefEntity>(
        entity: &T,
        event_type: &str,
    ) -> Result<Self, serde_json::Error> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let aggregate_id = entity.natural_key();

        let envelope = EventEnvelope {
            event_id: id,
            event_type: event_type.to_string(),
            aggregate_id: aggregate_id.clone(),
            aggregate_type: T::AGGREGATE_TYPE.to_string(),
            timestamp: created_at,
        };
        let payload = envelope.wrap(entity)?;

        Ok(OutboxRecord {
            id,
            aggregate_id,
            aggregate_type: T::AGGREGATE_TYPE.to_string(),
            event_type: event_type.to_string(),
            payload,
            status: OutboxStatus::Pending,
            created_at,
            processed_at: None,
            retry_count: 0,
            error_message: None,
            claimed_by: None,
            leased_until: None,
        })
    }

    /// Destination topic, named by aggregate type.
    pub fn topic(&self) -> String {
        format!("reference-data.{}", self.aggregate_type)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_processing(&self) -> bool {
        self.status == OutboxStatus::Processing
    }

    pub fn is_processed(&self) -> bool {
        self.status == OutboxStatus::Processed
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutboxStatus::Failed
    }

    /// Whether a `Processing` lease has expired as of `now`.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_processing()
            && match self.leased_until {
                Some(until) => until < now,
                // A Processing row without a lease is already orphaned.
                None => true,
            }
    }
}

/// Wire-format header of a published event. Consumers deduplicate on
/// `(aggregateId, eventType, eventId)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Serialize the envelope merged with the domain fields of `body`.
    /// Envelope keys win on collision.
    pub fn wrap<T: Serialize>(&self, body: &T) -> Result<String, serde_json::Error> {
        let mut fields = match serde_json::to_value(body)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        if let Value::Object(header) = serde_json::to_value(self)? {
            for (key, value) in header {
                fields.insert(key, value);
            }
        }
        serde_json::to_string(&Value::Object(fields))
    }
}
