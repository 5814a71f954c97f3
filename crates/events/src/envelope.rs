use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// Envelope for a published event, carrying routing metadata next to the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,
    event_version: u32,

    aggregate_id: Uuid,
    aggregate_type: String,

    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        event_type: impl Into<String>,
        event_version: u32,
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            event_version,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            occurred_at,
            payload,
        }
    }

    /// Wrap a typed domain event, taking type/version/time from the event itself.
    pub fn wrap(aggregate_id: Uuid, aggregate_type: impl Into<String>, event: E) -> Self
    where
        E: Event,
    {
        Self::new(
            Uuid::now_v7(),
            event.event_type(),
            event.version(),
            aggregate_id,
            aggregate_type,
            event.occurred_at(),
            event,
        )
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Replace the payload, keeping the metadata (e.g. typed event -> JSON).
    pub fn map_payload<F, T>(self, f: F) -> EventEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        EventEnvelope {
            event_id: self.event_id,
            event_type: self.event_type,
            event_version: self.event_version,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            occurred_at: self.occurred_at,
            payload: f(self.payload),
        }
    }
}
