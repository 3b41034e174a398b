//! `tadbir-events` — domain-agnostic event mechanics.
//!
//! Event trait, envelopes, pub/sub, projections and sagas. No storage, no
//! business rules; those live in the domain crates and in `tadbir-infra`.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod projection;
pub mod saga;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
pub use saga::{Saga, SagaAction};
