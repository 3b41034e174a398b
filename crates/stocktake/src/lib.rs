//! Stocktake domain module (event-sourced).
//!
//! A stock count reconciles physical inventory against the quantities on
//! record for one warehouse. Counts start from a snapshot of stock on hand,
//! collect counted quantities line by line, and are posted exactly once;
//! posting freezes the count and hands the variances to inventory and
//! accounting.

pub mod count;
pub mod input;
pub mod snapshot;

pub use count::{
    CountId, CountLine, CountPosted, CountStarted, CountStatus, LineCountRecorded, PostCount,
    RecordLineCount, StartCount, StockCount, StockCountCommand, StockCountEvent,
};
pub use input::parse_counted_quantity;
pub use snapshot::{StockSnapshotLine, seed_count_lines};
