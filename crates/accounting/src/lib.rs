//! Accounting domain: the journal aggregate and the inventory
//! adjustment entries derived from posted stock counts.

pub mod adjustment;
pub mod journal;

pub use adjustment::{
    StockVariance, adjustment_entry_lines, inventory_account, overage_account, shrinkage_account,
};
pub use journal::{
    Account, AccountKind, Journal, JournalCommand, JournalEntryLine, JournalEntryPosted,
    JournalEvent, JournalId, PostJournalEntry,
};
