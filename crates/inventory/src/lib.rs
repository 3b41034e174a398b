//! Inventory domain module (event-sourced).
//!
//! A stock item tracks the on-hand quantity of one product in one warehouse.
//! Receipts and issues move stock through normal operations; corrections are
//! reserved for posted stock counts and carry the originating count id.

pub mod item;

pub use item::{
    CorrectStock, IssueStock, ReceiveStock, RegisterStockItem, StockCorrected, StockIssued,
    StockItem, StockItemCommand, StockItemEvent, StockItemId, StockItemRegistered, StockReceived,
};
