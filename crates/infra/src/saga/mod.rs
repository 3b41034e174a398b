//! Saga infrastructure: persistence, command execution, and the runner.

pub mod count_posting;
pub mod runner;

use tadbir_core::AggregateId;
use tadbir_events::Saga;
use serde_json::Value as JsonValue;

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

pub use count_posting::{
    CountPostingExecutor, CountPostingSaga, CountPostingSagaEvent, CountPostingState, ExecutorError,
};
pub use runner::{SagaRunner, SagaRunnerError};

/// Repository for persisting saga events via the event store.
///
/// Saga streams live in the same store as domain streams but under their
/// own aggregate ids, derived from the correlation id by the saga itself.
pub struct SagaRepository<S: Saga, E: EventStore> {
    event_store: E,
    _phantom: std::marker::PhantomData<S>,
}

impl<S: Saga, E: EventStore> SagaRepository<S, E> {
    pub fn new(event_store: E) -> Self {
        Self {
            event_store,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Load saga event history for a saga instance.
    pub fn load(&self, saga_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.event_store.load_stream(saga_id)
    }

    /// Append a saga event (Emit action).
    pub fn append_emit(
        &self,
        saga_id: AggregateId,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let uncommitted = UncommittedEvent {
            aggregate_id: saga_id,
            aggregate_type: S::saga_type().to_string(),
            event_id: uuid::Uuid::now_v7(),
            event_type: event_type.to_string(),
            event_version: 1,
            payload,
            occurred_at: chrono::Utc::now(),
        };
        self.event_store
            .append(vec![uncommitted], tadbir_core::ExpectedVersion::Any)
    }
}

/// Command executor trait for saga actions.
pub trait CommandExecutor: Send + Sync {
    type Error: std::fmt::Debug;

    fn execute(
        &self,
        aggregate_type: &str,
        command_type: &str,
        payload: &JsonValue,
    ) -> Result<(), Self::Error>;
}
