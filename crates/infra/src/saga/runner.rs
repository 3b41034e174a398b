//! Saga runner: routes published envelopes into saga instances.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use tadbir_core::AggregateId;
use tadbir_events::{EventEnvelope, Saga, SagaAction};

use crate::event_store::{EventStore, EventStoreError};
use crate::saga::{CommandExecutor, SagaRepository};

#[derive(Debug, Error)]
pub enum SagaRunnerError<E: core::fmt::Debug> {
    #[error("saga event store failure: {0}")]
    Store(#[from] EventStoreError),

    #[error("failed to deserialize saga event: {0}")]
    Deserialize(String),

    #[error("saga action execution failed: {0:?}")]
    Execute(E),
}

/// Drives one saga type from the published event stream.
///
/// For every correlated envelope the runner rebuilds the saga's state by
/// folding its persisted events, asks the saga to react, then carries out
/// the resulting actions: `Emit` appends to the saga stream, `Command` and
/// `Compensate` go through the executor, `Complete` is logged.
pub struct SagaRunner<SG: Saga, E: EventStore, X: CommandExecutor> {
    repository: SagaRepository<SG, E>,
    executor: X,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<SG: Saga, E: EventStore, X: CommandExecutor> SagaRunner<SG, E, X> {
    pub fn new(repository: SagaRepository<SG, E>, executor: X) -> Self {
        Self {
            repository,
            executor,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Feed one published envelope through the saga.
    ///
    /// Envelopes the saga does not correlate are ignored. Duplicate
    /// deliveries are dropped by a per-stream cursor, which advances before
    /// any action runs so that a redelivered envelope can never re-issue
    /// commands.
    pub fn handle_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SagaRunnerError<X::Error>> {
        let Some(correlation) = SG::correlate(envelope) else {
            return Ok(());
        };

        if let Ok(mut cursors) = self.cursors.write() {
            let key = envelope.aggregate_id();
            let last = *cursors.get(&key).unwrap_or(&0);
            if envelope.sequence_number() <= last {
                // Duplicate delivery; already handled.
                return Ok(());
            }
            cursors.insert(key, envelope.sequence_number());
        }

        let saga_id = SG::saga_id(&correlation);

        // Fold persisted saga events into current state.
        let mut history = self.repository.load(saga_id)?;
        history.sort_by_key(|e| e.sequence_number);

        let mut state = SG::initial_state(&correlation);
        for stored in history {
            let event: SG::SagaEvent = serde_json::from_value(stored.payload)
                .map_err(|e| SagaRunnerError::Deserialize(e.to_string()))?;
            SG::apply(&mut state, &event);
        }

        let actions = SG::react(&state, &correlation, envelope);

        for action in actions {
            match action {
                SagaAction::Emit {
                    event_type,
                    payload,
                } => {
                    self.repository
                        .append_emit(saga_id, &event_type, payload.clone())?;
                    let event: SG::SagaEvent = serde_json::from_value(payload)
                        .map_err(|e| SagaRunnerError::Deserialize(e.to_string()))?;
                    SG::apply(&mut state, &event);
                }
                SagaAction::Command {
                    aggregate_type,
                    command_type,
                    payload,
                }
                | SagaAction::Compensate {
                    aggregate_type,
                    command_type,
                    payload,
                } => {
                    self.executor
                        .execute(&aggregate_type, &command_type, &payload)
                        .map_err(SagaRunnerError::Execute)?;
                }
                SagaAction::Complete => {
                    tracing::debug!(saga = SG::saga_type(), "saga completed");
                }
            }
        }

        Ok(())
    }
}
