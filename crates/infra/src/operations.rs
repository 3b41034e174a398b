//! Warehouse-gated entry points for stock movements and counts.
//!
//! A stock item aggregate only sees its own stream and cannot tell whether
//! its warehouse has closed. These entry points check the warehouse
//! directory read model before dispatching: closed warehouses accept no
//! receipts, no issues, and no new counts.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use tadbir_core::UserId;
use tadbir_events::{EventBus, EventEnvelope};
use tadbir_inventory::{IssueStock, ReceiveStock, StockItem, StockItemCommand, StockItemId};
use tadbir_products::ProductId;
use tadbir_stocktake::{CountId, StartCount, StockCount, StockCountCommand, seed_count_lines};
use tadbir_warehouses::WarehouseId;

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::projections::stock_on_hand::{ProductRow, StockOnHandProjection, StockOnHandRow};
use crate::projections::warehouse_directory::{WarehouseDirectoryProjection, WarehouseRow};
use crate::read_model::ReadModelStore;

#[derive(Debug, Error)]
pub enum StockOperationsError {
    #[error("warehouse {0} is not in the directory")]
    UnknownWarehouse(WarehouseId),

    #[error("warehouse {0} is closed")]
    WarehouseClosed(WarehouseId),

    #[error("no stock item {0} in the stock report")]
    UnknownStockItem(StockItemId),

    #[error("command dispatch failed: {0:?}")]
    Dispatch(DispatchError),
}

/// Dispatches warehouse-scoped commands with the directory gate applied.
///
/// Stock movements resolve their warehouse through the stock-on-hand read
/// model, the same way the posting executor resolves stock items. New
/// counts are seeded here from the warehouse snapshot, so a count can only
/// ever start from what the stock report says is on hand.
pub struct StockOperations<S, B, WD, PP, PS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    WD: ReadModelStore<WarehouseId, WarehouseRow>,
    PP: ReadModelStore<ProductId, ProductRow>,
    PS: ReadModelStore<StockItemId, StockOnHandRow>,
{
    dispatcher: CommandDispatcher<S, B>,
    directory: Arc<WarehouseDirectoryProjection<WD>>,
    stock: Arc<StockOnHandProjection<PP, PS>>,
}

impl<S, B, WD, PP, PS> StockOperations<S, B, WD, PP, PS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    WD: ReadModelStore<WarehouseId, WarehouseRow>,
    PP: ReadModelStore<ProductId, ProductRow>,
    PS: ReadModelStore<StockItemId, StockOnHandRow>,
{
    pub fn new(
        dispatcher: CommandDispatcher<S, B>,
        directory: Arc<WarehouseDirectoryProjection<WD>>,
        stock: Arc<StockOnHandProjection<PP, PS>>,
    ) -> Self {
        Self {
            dispatcher,
            directory,
            stock,
        }
    }

    fn ensure_open(&self, warehouse_id: WarehouseId) -> Result<(), StockOperationsError> {
        match self.directory.get(&warehouse_id) {
            None => Err(StockOperationsError::UnknownWarehouse(warehouse_id)),
            Some(row) if !row.open => Err(StockOperationsError::WarehouseClosed(warehouse_id)),
            Some(_) => Ok(()),
        }
    }

    fn warehouse_of(&self, item_id: StockItemId) -> Result<WarehouseId, StockOperationsError> {
        self.stock
            .stock_item(&item_id)
            .map(|row| row.warehouse_id)
            .ok_or(StockOperationsError::UnknownStockItem(item_id))
    }

    /// Receive stock into an item's warehouse, provided it is still open.
    pub fn receive_stock(&self, cmd: ReceiveStock) -> Result<(), StockOperationsError> {
        let item_id = cmd.item_id;
        self.ensure_open(self.warehouse_of(item_id)?)?;

        self.dispatcher
            .dispatch(
                item_id.0,
                "inventory.stock_item",
                StockItemCommand::ReceiveStock(cmd),
                |id| StockItem::empty(StockItemId::new(id)),
            )
            .map_err(StockOperationsError::Dispatch)?;
        Ok(())
    }

    /// Issue stock out of an item's warehouse, provided it is still open.
    pub fn issue_stock(&self, cmd: IssueStock) -> Result<(), StockOperationsError> {
        let item_id = cmd.item_id;
        self.ensure_open(self.warehouse_of(item_id)?)?;

        self.dispatcher
            .dispatch(
                item_id.0,
                "inventory.stock_item",
                StockItemCommand::IssueStock(cmd),
                |id| StockItem::empty(StockItemId::new(id)),
            )
            .map_err(StockOperationsError::Dispatch)?;
        Ok(())
    }

    /// Start a count over an open warehouse, seeded from its stock snapshot.
    pub fn start_count(
        &self,
        count_id: CountId,
        warehouse_id: WarehouseId,
        started_on: NaiveDate,
        started_by: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), StockOperationsError> {
        self.ensure_open(warehouse_id)?;

        let lines = seed_count_lines(&self.stock.snapshot(warehouse_id));
        self.dispatcher
            .dispatch(
                count_id.0,
                "stocktake.count",
                StockCountCommand::StartCount(StartCount {
                    count_id,
                    warehouse_id,
                    started_on,
                    started_by,
                    lines,
                    occurred_at,
                }),
                |id| StockCount::empty(CountId::new(id)),
            )
            .map_err(StockOperationsError::Dispatch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tadbir_core::AggregateId;
    use tadbir_events::InMemoryEventBus;
    use tadbir_stocktake::StockCountEvent;

    use crate::event_store::InMemoryEventStore;
    use crate::read_model::InMemoryReadModelStore;

    type DirectoryRows = Arc<InMemoryReadModelStore<WarehouseId, WarehouseRow>>;
    type ProductRows = Arc<InMemoryReadModelStore<ProductId, ProductRow>>;
    type StockRows = Arc<InMemoryReadModelStore<StockItemId, StockOnHandRow>>;
    type TestOperations = StockOperations<
        Arc<InMemoryEventStore>,
        Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
        DirectoryRows,
        ProductRows,
        StockRows,
    >;

    struct Fixture {
        store: Arc<InMemoryEventStore>,
        directory_rows: DirectoryRows,
        product_rows: ProductRows,
        stock_rows: StockRows,
        operations: TestOperations,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> =
            Arc::new(InMemoryEventBus::new());
        let directory_rows: DirectoryRows = Arc::new(InMemoryReadModelStore::new());
        let product_rows: ProductRows = Arc::new(InMemoryReadModelStore::new());
        let stock_rows: StockRows = Arc::new(InMemoryReadModelStore::new());

        let operations = StockOperations::new(
            CommandDispatcher::new(store.clone(), bus),
            Arc::new(WarehouseDirectoryProjection::new(directory_rows.clone())),
            Arc::new(StockOnHandProjection::new(
                product_rows.clone(),
                stock_rows.clone(),
            )),
        );

        Fixture {
            store,
            directory_rows,
            product_rows,
            stock_rows,
            operations,
        }
    }

    fn seed_warehouse(fixture: &Fixture, open: bool) -> WarehouseId {
        let warehouse_id = WarehouseId::new(AggregateId::new());
        fixture.directory_rows.upsert(
            warehouse_id,
            WarehouseRow {
                warehouse_id,
                name: "Main Warehouse".to_string(),
                code: "WH-MAIN".to_string(),
                open,
            },
        );
        warehouse_id
    }

    fn seed_stock(
        fixture: &Fixture,
        warehouse_id: WarehouseId,
        on_hand: i64,
    ) -> (StockItemId, ProductId) {
        let product_id = ProductId::new(AggregateId::new());
        fixture.product_rows.upsert(
            product_id,
            ProductRow {
                product_id,
                sku: "ANV-001".to_string(),
                name: "Anvil".to_string(),
                unit_cost: Some(100),
                archived: false,
            },
        );

        let item_id = StockItemId::new(AggregateId::new());
        fixture.stock_rows.upsert(
            item_id,
            StockOnHandRow {
                item_id,
                warehouse_id,
                product_id,
                on_hand,
            },
        );
        (item_id, product_id)
    }

    #[test]
    fn movements_into_a_closed_warehouse_are_rejected() {
        let fx = fixture();
        let warehouse_id = seed_warehouse(&fx, false);
        let (item_id, _) = seed_stock(&fx, warehouse_id, 10);

        let err = fx
            .operations
            .receive_stock(ReceiveStock {
                item_id,
                quantity: 5,
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StockOperationsError::WarehouseClosed(id) if id == warehouse_id));

        let err = fx
            .operations
            .issue_stock(IssueStock {
                item_id,
                quantity: 1,
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StockOperationsError::WarehouseClosed(id) if id == warehouse_id));

        // The gate fires before dispatch; the item stream stays untouched.
        assert!(fx.store.load_stream(item_id.0).unwrap().is_empty());
    }

    #[test]
    fn movements_against_unknown_stock_items_are_rejected() {
        let fx = fixture();
        seed_warehouse(&fx, true);
        let item_id = StockItemId::new(AggregateId::new());

        let err = fx
            .operations
            .receive_stock(ReceiveStock {
                item_id,
                quantity: 5,
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StockOperationsError::UnknownStockItem(id) if id == item_id));
    }

    #[test]
    fn start_count_requires_an_open_warehouse() {
        let fx = fixture();
        let closed = seed_warehouse(&fx, false);
        let count_id = CountId::new(AggregateId::new());
        let started_on = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

        let err = fx
            .operations
            .start_count(count_id, closed, started_on, UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockOperationsError::WarehouseClosed(id) if id == closed));

        let unknown = WarehouseId::new(AggregateId::new());
        let err = fx
            .operations
            .start_count(count_id, unknown, started_on, UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockOperationsError::UnknownWarehouse(id) if id == unknown));

        assert!(fx.store.load_stream(count_id.0).unwrap().is_empty());
    }

    #[test]
    fn start_count_seeds_lines_from_the_snapshot() {
        let fx = fixture();
        let warehouse_id = seed_warehouse(&fx, true);
        let (_, product_id) = seed_stock(&fx, warehouse_id, 10);

        let count_id = CountId::new(AggregateId::new());
        fx.operations
            .start_count(
                count_id,
                warehouse_id,
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                UserId::new(),
                Utc::now(),
            )
            .unwrap();

        let events = fx.store.load_stream(count_id.0).unwrap();
        assert_eq!(events.len(), 1);

        let event: StockCountEvent = serde_json::from_value(events[0].payload.clone()).unwrap();
        match event {
            StockCountEvent::CountStarted(started) => {
                assert_eq!(started.warehouse_id, warehouse_id);
                assert_eq!(started.lines.len(), 1);
                assert_eq!(started.lines[0].product_id, product_id);
                assert_eq!(started.lines[0].system_qty, 10);
                assert_eq!(started.lines[0].counted, None);
            }
            other => panic!("Expected CountStarted, got {other:?}"),
        }
    }
}
