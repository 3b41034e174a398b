use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use tadbir_core::AggregateId;
use tadbir_events::{EventEnvelope, Projection};
use tadbir_inventory::{StockItemEvent, StockItemId};
use tadbir_products::{ProductEvent, ProductId};
use tadbir_stocktake::StockSnapshotLine;
use tadbir_warehouses::WarehouseId;

use crate::read_model::ReadModelStore;

/// Catalog side of the read model: one row per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_cost: Option<u64>,
    pub archived: bool,
}

/// Current stock position of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOnHandRow {
    pub item_id: StockItemId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub on_hand: i64,
}

#[derive(Debug, Error)]
pub enum StockOnHandProjectionError {
    #[error("failed to deserialize event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("stock movement for unknown item: {0}")]
    MissingStockItem(String),
}

/// Stock-on-hand projection.
///
/// Consumes product and stock item envelopes and maintains the read model a
/// stock count is seeded from: products with their costed catalog data, and
/// per-warehouse on-hand quantities. Read models are disposable and
/// rebuildable from the event stream.
#[derive(Debug)]
pub struct StockOnHandProjection<P, S>
where
    P: ReadModelStore<ProductId, ProductRow>,
    S: ReadModelStore<StockItemId, StockOnHandRow>,
{
    products: P,
    stock: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<P, S> StockOnHandProjection<P, S>
where
    P: ReadModelStore<ProductId, ProductRow>,
    S: ReadModelStore<StockItemId, StockOnHandRow>,
{
    pub fn new(products: P, stock: S) -> Self {
        Self {
            products,
            stock,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn product(&self, product_id: &ProductId) -> Option<ProductRow> {
        self.products.get(product_id)
    }

    pub fn stock_item(&self, item_id: &StockItemId) -> Option<StockOnHandRow> {
        self.stock.get(item_id)
    }

    /// Locate the stock row for a product in a warehouse.
    pub fn find_item(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Option<StockOnHandRow> {
        self.stock
            .list()
            .into_iter()
            .find(|row| row.warehouse_id == warehouse_id && row.product_id == product_id)
    }

    /// Snapshot of a warehouse's stock, joined with the product catalog.
    ///
    /// This is the seed for a new stock count. Rows for unknown or archived
    /// products are left out, and the result is ordered by product id so
    /// count sheets come out the same every time.
    pub fn snapshot(&self, warehouse_id: WarehouseId) -> Vec<StockSnapshotLine> {
        let mut lines: Vec<StockSnapshotLine> = self
            .stock
            .list()
            .into_iter()
            .filter(|row| row.warehouse_id == warehouse_id)
            .filter_map(|row| {
                let product = self.products.get(&row.product_id)?;
                if product.archived {
                    return None;
                }
                Some(StockSnapshotLine {
                    product_id: row.product_id,
                    product_name: product.name,
                    unit_cost: product.unit_cost,
                    on_hand: row.on_hand,
                })
            })
            .collect();

        lines.sort_by_key(|l| *l.product_id.0.as_uuid().as_bytes());
        lines
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces monotonic sequence per aggregate stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    /// - Envelopes from streams this projection does not consume are skipped
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), StockOnHandProjectionError> {
        match envelope.aggregate_type() {
            "products.product" | "inventory.stock_item" => {}
            _ => return Ok(()),
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&aggregate_id).unwrap_or(&0);

            if seq == 0 {
                return Err(StockOnHandProjectionError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                // The first event may sit at any positive sequence (catch-up
                // from mid-stream); after that, strict increments only.
                return Err(StockOnHandProjectionError::NonMonotonicSequence { last, found: seq });
            }

            match envelope.aggregate_type() {
                "products.product" => self.apply_product(aggregate_id, envelope.payload())?,
                _ => self.apply_stock(aggregate_id, envelope.payload())?,
            }

            // Advance cursor after successful apply.
            cursors.insert(aggregate_id, seq);
        }

        Ok(())
    }

    fn apply_product(
        &self,
        aggregate_id: AggregateId,
        payload: &JsonValue,
    ) -> Result<(), StockOnHandProjectionError> {
        let event: ProductEvent = serde_json::from_value(payload.clone())
            .map_err(|e| StockOnHandProjectionError::Deserialize(e.to_string()))?;

        let product_id = match &event {
            ProductEvent::ProductRegistered(e) => e.product_id,
            ProductEvent::ProductCostUpdated(e) => e.product_id,
            ProductEvent::ProductArchived(e) => e.product_id,
        };
        if product_id.0 != aggregate_id {
            return Err(StockOnHandProjectionError::StreamMismatch(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            ProductEvent::ProductRegistered(e) => {
                self.products.upsert(
                    e.product_id,
                    ProductRow {
                        product_id: e.product_id,
                        sku: e.sku,
                        name: e.name,
                        unit_cost: e.cost.unit_cost,
                        archived: false,
                    },
                );
            }
            ProductEvent::ProductCostUpdated(e) => {
                // Unknown row means we attached mid-stream; a rebuild backfills it.
                if let Some(mut row) = self.products.get(&e.product_id) {
                    row.unit_cost = e.cost.unit_cost;
                    self.products.upsert(e.product_id, row);
                }
            }
            ProductEvent::ProductArchived(e) => {
                if let Some(mut row) = self.products.get(&e.product_id) {
                    row.archived = true;
                    self.products.upsert(e.product_id, row);
                }
            }
        }

        Ok(())
    }

    fn apply_stock(
        &self,
        aggregate_id: AggregateId,
        payload: &JsonValue,
    ) -> Result<(), StockOnHandProjectionError> {
        let event: StockItemEvent = serde_json::from_value(payload.clone())
            .map_err(|e| StockOnHandProjectionError::Deserialize(e.to_string()))?;

        let item_id = match &event {
            StockItemEvent::StockItemRegistered(e) => e.item_id,
            StockItemEvent::StockReceived(e) => e.item_id,
            StockItemEvent::StockIssued(e) => e.item_id,
            StockItemEvent::StockCorrected(e) => e.item_id,
        };
        if item_id.0 != aggregate_id {
            return Err(StockOnHandProjectionError::StreamMismatch(
                "event item_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            StockItemEvent::StockItemRegistered(e) => {
                self.stock.upsert(
                    e.item_id,
                    StockOnHandRow {
                        item_id: e.item_id,
                        warehouse_id: e.warehouse_id,
                        product_id: e.product_id,
                        on_hand: 0,
                    },
                );
            }
            StockItemEvent::StockReceived(e) => {
                self.adjust_on_hand(e.item_id, e.quantity)?;
            }
            StockItemEvent::StockIssued(e) => {
                self.adjust_on_hand(e.item_id, -e.quantity)?;
            }
            StockItemEvent::StockCorrected(e) => {
                self.adjust_on_hand(e.item_id, e.delta)?;
            }
        }

        Ok(())
    }

    fn adjust_on_hand(
        &self,
        item_id: StockItemId,
        delta: i64,
    ) -> Result<(), StockOnHandProjectionError> {
        let mut row = self
            .stock
            .get(&item_id)
            .ok_or_else(|| StockOnHandProjectionError::MissingStockItem(item_id.to_string()))?;
        row.on_hand += delta;
        self.stock.upsert(item_id, row);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), StockOnHandProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.products.clear();
        self.stock.clear();

        // Deterministic replay order: aggregate, then sequence.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

impl<P, S> Projection for StockOnHandProjection<P, S>
where
    P: ReadModelStore<ProductId, ProductRow>,
    S: ReadModelStore<StockItemId, StockOnHandRow>,
{
    type Error = StockOnHandProjectionError;

    fn name(&self) -> &'static str {
        "stock_on_hand"
    }

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.apply_envelope(envelope)
    }
}
