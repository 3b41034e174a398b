//! Warehouses domain module (event-sourced).
//!
//! Warehouses are the physical locations that scope stock levels and stock
//! counts. Pure domain logic only.

pub mod warehouse;

pub use warehouse::{
    CloseWarehouse, OpenWarehouse, RenameWarehouse, Warehouse, WarehouseClosed, WarehouseCommand,
    WarehouseEvent, WarehouseId, WarehouseOpened, WarehouseRenamed, WarehouseStatus,
};
