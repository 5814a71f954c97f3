//! Domain event mechanics: the `Event` contract, envelopes and the in-process bus.
//!
//! Domain crates define their own event enums and implement [`Event`] for them;
//! the infra layer wraps committed events in an [`EventEnvelope`] and publishes
//! them on an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
