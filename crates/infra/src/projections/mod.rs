//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are:
//! - **Rebuildable**: can be reconstructed from the event stream
//! - **Idempotent**: safe for at-least-once delivery
//! - **Disposable**: derived data, never the source of truth

pub mod posted_counts;
pub mod stock_on_hand;
pub mod warehouse_directory;

pub use posted_counts::{
    PostedCountLine, PostedCountSummary, PostedCountsError, PostedCountsProjection,
};
pub use stock_on_hand::{
    ProductRow, StockOnHandProjection, StockOnHandProjectionError, StockOnHandRow,
};
pub use warehouse_directory::{WarehouseDirectoryError, WarehouseDirectoryProjection, WarehouseRow};
