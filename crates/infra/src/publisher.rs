//! Publishes committed domain events to the in-process bus.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use storefront_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};

/// Message type carried on the storefront bus.
pub type EventMessage = EventEnvelope<JsonValue>;

/// Thin wrapper that turns typed events into JSON envelopes.
///
/// Publishing happens after the state change is committed, so a failure here
/// is logged and swallowed: the fact stands whether or not anyone heard it.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    bus: Arc<InMemoryEventBus<EventMessage>>,
}

impl EventPublisher {
    pub fn new(bus: Arc<InMemoryEventBus<EventMessage>>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus<EventMessage>> {
        &self.bus
    }

    pub fn publish<E>(&self, aggregate_type: &str, aggregate_id: impl Into<Uuid>, event: E)
    where
        E: Event + Serialize,
    {
        let aggregate_id = aggregate_id.into();
        let envelope = EventEnvelope::wrap(aggregate_id, aggregate_type, event);
        let payload = match serde_json::to_value(envelope.payload()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(event_type = envelope.event_type(), error = %err, "event serialization failed; not published");
                return;
            }
        };
        let message = envelope.map_payload(|_| payload);

        debug!(
            event_type = message.event_type(),
            aggregate_type,
            aggregate_id = %aggregate_id,
            "publishing event"
        );

        if let Err(err) = self.bus.publish(message) {
            warn!(aggregate_type, aggregate_id = %aggregate_id, error = %err, "event publish failed");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryEventBus::new()))
    }
}
