//! Count posting saga.
//!
//! Posting a stock count triggers two follow-ups in other aggregates:
//!
//! 1. every line with a non-zero variance becomes a stock correction, so
//!    inventory converges on the counted quantities
//! 2. the valued variances roll into one balanced journal entry
//!
//! The saga issues both from the `CountPosted` event, then waits for the
//! corrections to come back as `StockCorrected` events before completing.
//! If variance valuation fails, the saga fails without issuing anything.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use tadbir_accounting::{
    Journal, JournalCommand, JournalEntryLine, JournalId, PostJournalEntry, StockVariance,
    adjustment_entry_lines,
};
use tadbir_core::AggregateId;
use tadbir_events::{EventBus, EventEnvelope, Saga, SagaAction};
use tadbir_inventory::{CorrectStock, StockItem, StockItemCommand, StockItemEvent, StockItemId};
use tadbir_products::ProductId;
use tadbir_stocktake::{CountId, CountPosted, StockCountEvent};
use tadbir_warehouses::WarehouseId;

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::projections::stock_on_hand::{ProductRow, StockOnHandProjection, StockOnHandRow};
use crate::read_model::ReadModelStore;
use crate::saga::CommandExecutor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountPostingState {
    #[default]
    WaitingForCountPosted,
    ApplyingCorrections {
        pending: u32,
    },
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CountPostingSagaEvent {
    CountPostedReceived { corrections: u32 },
    CorrectionApplied,
    SagaCompleted,
    SagaFailed { reason: String },
}

/// Build an `Emit` action whose payload round-trips back into
/// [`CountPostingSagaEvent`] when the runner folds saga state.
///
/// Payloads are assembled by hand so emitting cannot fail; the exhaustive
/// match keeps them in lockstep with the enum's serde shape.
fn emit(event: &CountPostingSagaEvent) -> SagaAction {
    let (event_type, payload) = match event {
        CountPostingSagaEvent::CountPostedReceived { corrections } => (
            "count_posted_received",
            json!({ "type": "count_posted_received", "corrections": corrections }),
        ),
        CountPostingSagaEvent::CorrectionApplied => {
            ("correction_applied", json!({ "type": "correction_applied" }))
        }
        CountPostingSagaEvent::SagaCompleted => {
            ("saga_completed", json!({ "type": "saga_completed" }))
        }
        CountPostingSagaEvent::SagaFailed { reason } => (
            "saga_failed",
            json!({ "type": "saga_failed", "reason": reason }),
        ),
    };
    SagaAction::Emit {
        event_type: event_type.to_string(),
        payload,
    }
}

fn react_to_posted_count(correlation: &CountId, posted: &CountPosted) -> Vec<SagaAction> {
    let variances: Vec<StockVariance> = posted
        .lines
        .iter()
        .map(|line| StockVariance {
            quantity: line.variance(),
            unit_cost: line.unit_cost,
        })
        .collect();

    let entry_lines = match adjustment_entry_lines(&variances) {
        Ok(lines) => lines,
        Err(err) => {
            return vec![emit(&CountPostingSagaEvent::SagaFailed {
                reason: err.to_string(),
            })];
        }
    };

    let corrections: Vec<SagaAction> = posted
        .lines
        .iter()
        .filter(|line| line.variance() != 0)
        .map(|line| SagaAction::Command {
            aggregate_type: "inventory.stock_item".to_string(),
            command_type: "CorrectStock".to_string(),
            payload: json!({
                "product_id": line.product_id,
                "warehouse_id": posted.warehouse_id,
                "delta": line.variance(),
                "count_id": correlation.0,
                "occurred_at": posted.occurred_at,
            }),
        })
        .collect();
    let pending = corrections.len() as u32;

    let mut actions = vec![emit(&CountPostingSagaEvent::CountPostedReceived {
        corrections: pending,
    })];

    if !entry_lines.is_empty() {
        // The entry id is the count id, so redispatching the same count can
        // never mint a second, differently-identified entry.
        actions.push(SagaAction::Command {
            aggregate_type: "accounting.journal".to_string(),
            command_type: "PostJournalEntry".to_string(),
            payload: json!({
                "entry_id": correlation.0,
                "lines": entry_lines,
                "description": format!("inventory count adjustment {correlation}"),
                "occurred_at": posted.occurred_at,
            }),
        });
    }

    actions.extend(corrections);

    if pending == 0 {
        actions.push(SagaAction::Complete);
    }

    actions
}

pub struct CountPostingSaga;

impl Saga for CountPostingSaga {
    type State = CountPostingState;
    type SagaEvent = CountPostingSagaEvent;
    type CorrelationId = CountId;

    fn saga_type() -> &'static str {
        "saga.count_posting"
    }

    fn correlate(envelope: &EventEnvelope<JsonValue>) -> Option<Self::CorrelationId> {
        match envelope.aggregate_type() {
            "stocktake.count" => {
                let event: StockCountEvent =
                    serde_json::from_value(envelope.payload().clone()).ok()?;
                Some(match event {
                    StockCountEvent::CountStarted(e) => e.count_id,
                    StockCountEvent::LineCountRecorded(e) => e.count_id,
                    StockCountEvent::CountPosted(e) => e.count_id,
                })
            }
            "inventory.stock_item" => {
                // Corrections carry the originating count id; other stock
                // movements do not concern this saga.
                let event: StockItemEvent =
                    serde_json::from_value(envelope.payload().clone()).ok()?;
                match event {
                    StockItemEvent::StockCorrected(e) => Some(CountId::new(e.count_id)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn saga_id(correlation: &Self::CorrelationId) -> AggregateId {
        // The saga stream shares the event store with the count stream, so
        // it needs its own id; derive it deterministically from the count.
        AggregateId::from_uuid(Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            correlation.0.as_uuid().as_bytes(),
        ))
    }

    fn apply(state: &mut Self::State, event: &Self::SagaEvent) {
        match event {
            CountPostingSagaEvent::CountPostedReceived { corrections } => {
                *state = if *corrections == 0 {
                    CountPostingState::Completed
                } else {
                    CountPostingState::ApplyingCorrections {
                        pending: *corrections,
                    }
                };
            }
            CountPostingSagaEvent::CorrectionApplied => {
                if let CountPostingState::ApplyingCorrections { pending } = state {
                    *pending = pending.saturating_sub(1);
                }
            }
            CountPostingSagaEvent::SagaCompleted => {
                *state = CountPostingState::Completed;
            }
            CountPostingSagaEvent::SagaFailed { .. } => {
                *state = CountPostingState::Failed;
            }
        }
    }

    fn react(
        state: &Self::State,
        correlation: &Self::CorrelationId,
        incoming: &EventEnvelope<JsonValue>,
    ) -> Vec<SagaAction> {
        match state {
            CountPostingState::WaitingForCountPosted => {
                if incoming.aggregate_type() != "stocktake.count" {
                    return vec![];
                }
                match serde_json::from_value(incoming.payload().clone()) {
                    Ok(StockCountEvent::CountPosted(posted)) => {
                        react_to_posted_count(correlation, &posted)
                    }
                    // Draft activity; nothing to orchestrate yet.
                    _ => vec![],
                }
            }
            CountPostingState::ApplyingCorrections { pending } => {
                if incoming.aggregate_type() != "inventory.stock_item" {
                    return vec![];
                }
                match serde_json::from_value(incoming.payload().clone()) {
                    Ok(StockItemEvent::StockCorrected(_)) => {
                        let mut actions = vec![emit(&CountPostingSagaEvent::CorrectionApplied)];
                        if *pending <= 1 {
                            actions.push(emit(&CountPostingSagaEvent::SagaCompleted));
                            actions.push(SagaAction::Complete);
                        }
                        actions
                    }
                    _ => vec![],
                }
            }
            CountPostingState::Completed | CountPostingState::Failed => vec![],
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown saga command {aggregate_type}/{command_type}")]
    UnknownCommand {
        aggregate_type: String,
        command_type: String,
    },

    #[error("malformed saga command payload: {0}")]
    Payload(String),

    #[error("no stock item for product {product_id} in warehouse {warehouse_id}")]
    MissingStockItem {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    #[error("command dispatch failed: {0:?}")]
    Dispatch(DispatchError),
}

#[derive(Debug, Deserialize)]
struct CorrectStockRequest {
    product_id: ProductId,
    warehouse_id: WarehouseId,
    delta: i64,
    count_id: AggregateId,
    occurred_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct PostJournalEntryRequest {
    entry_id: Uuid,
    lines: Vec<JournalEntryLine>,
    description: Option<String>,
    occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Executes count posting saga commands against the real aggregates.
///
/// The saga thinks in products and warehouses; this executor resolves the
/// concrete stock item through the stock-on-hand read model and owns the
/// journal the adjustment entries land in.
pub struct CountPostingExecutor<S, B, PP, PS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    PP: ReadModelStore<ProductId, ProductRow>,
    PS: ReadModelStore<StockItemId, StockOnHandRow>,
{
    dispatcher: CommandDispatcher<S, B>,
    stock: Arc<StockOnHandProjection<PP, PS>>,
    journal_id: JournalId,
}

impl<S, B, PP, PS> CountPostingExecutor<S, B, PP, PS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    PP: ReadModelStore<ProductId, ProductRow>,
    PS: ReadModelStore<StockItemId, StockOnHandRow>,
{
    pub fn new(
        dispatcher: CommandDispatcher<S, B>,
        stock: Arc<StockOnHandProjection<PP, PS>>,
        journal_id: JournalId,
    ) -> Self {
        Self {
            dispatcher,
            stock,
            journal_id,
        }
    }
}

impl<S, B, PP, PS> CommandExecutor for CountPostingExecutor<S, B, PP, PS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>> + Send + Sync,
    PP: ReadModelStore<ProductId, ProductRow>,
    PS: ReadModelStore<StockItemId, StockOnHandRow>,
{
    type Error = ExecutorError;

    fn execute(
        &self,
        aggregate_type: &str,
        command_type: &str,
        payload: &JsonValue,
    ) -> Result<(), Self::Error> {
        match (aggregate_type, command_type) {
            ("inventory.stock_item", "CorrectStock") => {
                let request: CorrectStockRequest = serde_json::from_value(payload.clone())
                    .map_err(|e| ExecutorError::Payload(e.to_string()))?;

                let row = self
                    .stock
                    .find_item(request.warehouse_id, request.product_id)
                    .ok_or(ExecutorError::MissingStockItem {
                        product_id: request.product_id,
                        warehouse_id: request.warehouse_id,
                    })?;

                let command = StockItemCommand::CorrectStock(CorrectStock {
                    item_id: row.item_id,
                    delta: request.delta,
                    count_id: request.count_id,
                    occurred_at: request.occurred_at,
                });
                self.dispatcher
                    .dispatch(row.item_id.0, "inventory.stock_item", command, |id| {
                        StockItem::empty(StockItemId::new(id))
                    })
                    .map_err(ExecutorError::Dispatch)?;
                Ok(())
            }
            ("accounting.journal", "PostJournalEntry") => {
                let request: PostJournalEntryRequest = serde_json::from_value(payload.clone())
                    .map_err(|e| ExecutorError::Payload(e.to_string()))?;

                let command = JournalCommand::PostEntry(PostJournalEntry {
                    journal_id: self.journal_id,
                    entry_id: request.entry_id,
                    lines: request.lines,
                    description: request.description,
                    occurred_at: request.occurred_at,
                });
                self.dispatcher
                    .dispatch(self.journal_id.0, "accounting.journal", command, |id| {
                        Journal::empty(JournalId::new(id))
                    })
                    .map_err(ExecutorError::Dispatch)?;
                Ok(())
            }
            _ => Err(ExecutorError::UnknownCommand {
                aggregate_type: aggregate_type.to_string(),
                command_type: command_type.to_string(),
            }),
        }
    }
}
