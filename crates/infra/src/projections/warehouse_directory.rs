use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use tadbir_core::AggregateId;
use tadbir_events::{EventEnvelope, Projection};
use tadbir_warehouses::{WarehouseEvent, WarehouseId};

use crate::read_model::ReadModelStore;

/// Directory row: one per warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseRow {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: String,
    pub open: bool,
}

#[derive(Debug, Error)]
pub enum WarehouseDirectoryError {
    #[error("failed to deserialize warehouse event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Warehouse directory projection: names, codes, and open/closed status.
#[derive(Debug)]
pub struct WarehouseDirectoryProjection<S>
where
    S: ReadModelStore<WarehouseId, WarehouseRow>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> WarehouseDirectoryProjection<S>
where
    S: ReadModelStore<WarehouseId, WarehouseRow>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, warehouse_id: &WarehouseId) -> Option<WarehouseRow> {
        self.store.get(warehouse_id)
    }

    /// All warehouses, ordered by name.
    pub fn list(&self) -> Vec<WarehouseRow> {
        let mut rows = self.store.list();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Apply a published envelope into the projection (idempotent).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), WarehouseDirectoryError> {
        if envelope.aggregate_type() != "warehouses.warehouse" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&aggregate_id).unwrap_or(&0);

            if seq == 0 {
                return Err(WarehouseDirectoryError::NonMonotonicSequence { last, found: seq });
            }
            if seq <= last {
                return Ok(());
            }
            if seq != last + 1 && last != 0 {
                return Err(WarehouseDirectoryError::NonMonotonicSequence { last, found: seq });
            }

            let event: WarehouseEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| WarehouseDirectoryError::Deserialize(e.to_string()))?;

            let warehouse_id = match &event {
                WarehouseEvent::WarehouseOpened(e) => e.warehouse_id,
                WarehouseEvent::WarehouseRenamed(e) => e.warehouse_id,
                WarehouseEvent::WarehouseClosed(e) => e.warehouse_id,
            };
            if warehouse_id.0 != aggregate_id {
                return Err(WarehouseDirectoryError::StreamMismatch(
                    "event warehouse_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                WarehouseEvent::WarehouseOpened(e) => {
                    self.store.upsert(
                        e.warehouse_id,
                        WarehouseRow {
                            warehouse_id: e.warehouse_id,
                            name: e.name,
                            code: e.code,
                            open: true,
                        },
                    );
                }
                WarehouseEvent::WarehouseRenamed(e) => {
                    if let Some(mut row) = self.store.get(&e.warehouse_id) {
                        row.name = e.name;
                        self.store.upsert(e.warehouse_id, row);
                    }
                }
                WarehouseEvent::WarehouseClosed(e) => {
                    if let Some(mut row) = self.store.get(&e.warehouse_id) {
                        row.open = false;
                        self.store.upsert(e.warehouse_id, row);
                    }
                }
            }

            cursors.insert(aggregate_id, seq);
        }

        Ok(())
    }
}

impl<S> Projection for WarehouseDirectoryProjection<S>
where
    S: ReadModelStore<WarehouseId, WarehouseRow>,
{
    type Error = WarehouseDirectoryError;

    fn name(&self) -> &'static str {
        "warehouse_directory"
    }

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.apply_envelope(envelope)
    }
}
