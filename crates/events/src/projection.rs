use serde_json::Value as JsonValue;

use crate::EventEnvelope;

/// A projection builds a read model from an append-only event stream.
///
/// Projections implement the **CQRS read model pattern**: they fold events
/// (write model) into queryable state (read model). Read models are
/// denormalized for the queries they serve, and they are **disposable**: the
/// event store is the source of truth, so any read model can be deleted and
/// rebuilt by replaying events from scratch.
///
/// ## Idempotency
///
/// The bus delivers at-least-once, so `apply` must tolerate duplicates.
/// Implementations track the last applied `sequence_number` per stream and
/// skip envelopes at or below it; an envelope that jumps ahead of the cursor
/// is an error (a gap means missed events and a stale read model).
///
/// ## Untyped input
///
/// Envelopes arrive with a JSON payload because one subscription carries
/// events from many aggregate types. A projection inspects
/// `envelope.aggregate_type()`, deserializes the payloads it understands and
/// ignores the rest.
pub trait Projection: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Stable projection name (used for logging/diagnostics).
    fn name(&self) -> &'static str;

    /// Apply a single envelope, updating the read model.
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error>;
}
