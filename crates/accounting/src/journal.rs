//! Journal aggregate.
//!
//! The journal records double-entry postings as immutable events. It holds
//! no balances; those belong to read models folding over
//! [`JournalEntryPosted`] events. The aggregate's only job is to refuse
//! entries that are empty, carry non-positive amounts, or do not balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tadbir_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ValueObject};
use uuid::Uuid;

/// Typed identifier for a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalId(pub AggregateId);

impl JournalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JournalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The five fundamental account categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// A ledger account referenced by journal lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
}

/// One side of a double-entry posting. Amounts are minor currency units
/// and always positive; direction lives in `is_debit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub account: Account,
    pub amount: i64,
    pub is_debit: bool,
}

impl ValueObject for JournalEntryLine {}

/// Post a balanced entry to the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostJournalEntry {
    pub journal_id: JournalId,
    pub entry_id: Uuid,
    pub lines: Vec<JournalEntryLine>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalCommand {
    PostEntry(PostJournalEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryPosted {
    pub journal_id: JournalId,
    pub entry_id: Uuid,
    pub lines: Vec<JournalEntryLine>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEvent {
    EntryPosted(JournalEntryPosted),
}

impl tadbir_events::Event for JournalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            JournalEvent::EntryPosted(_) => "accounting.journal.entry_posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JournalEvent::EntryPosted(e) => e.occurred_at,
        }
    }
}

/// Event-sourced journal. The first posted entry creates the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Journal {
    id: JournalId,
    version: u64,
    created: bool,
}

impl Journal {
    pub fn empty(id: JournalId) -> Self {
        Self {
            id,
            version: 0,
            created: false,
        }
    }

    fn handle_post(&self, cmd: &PostJournalEntry) -> Result<Vec<JournalEvent>, DomainError> {
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("journal entry must have lines"));
        }

        let mut debits: i128 = 0;
        let mut credits: i128 = 0;
        for line in &cmd.lines {
            if line.amount <= 0 {
                return Err(DomainError::validation("amount must be positive"));
            }
            if line.is_debit {
                debits += i128::from(line.amount);
            } else {
                credits += i128::from(line.amount);
            }
        }
        if debits != credits {
            return Err(DomainError::invariant("debits must equal credits"));
        }

        Ok(vec![JournalEvent::EntryPosted(JournalEntryPosted {
            journal_id: cmd.journal_id,
            entry_id: cmd.entry_id,
            lines: cmd.lines.clone(),
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

impl AggregateRoot for Journal {
    type Id = JournalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Journal {
    type Command = JournalCommand;
    type Event = JournalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            JournalEvent::EntryPosted(e) => {
                self.id = e.journal_id;
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            JournalCommand::PostEntry(cmd) => self.handle_post(cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_journal_id() -> JournalId {
        JournalId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        "2025-03-14T09:30:00Z".parse().unwrap()
    }

    fn cash_account() -> Account {
        Account {
            code: "1000".to_string(),
            name: "Cash".to_string(),
            kind: AccountKind::Asset,
        }
    }

    fn sales_account() -> Account {
        Account {
            code: "4000".to_string(),
            name: "Sales".to_string(),
            kind: AccountKind::Revenue,
        }
    }

    fn line(account: Account, amount: i64, is_debit: bool) -> JournalEntryLine {
        JournalEntryLine {
            account,
            amount,
            is_debit,
        }
    }

    #[test]
    fn post_journal_entry_emits_event_when_balanced() {
        let journal_id = test_journal_id();
        let journal = Journal::empty(journal_id);

        let events = journal
            .handle(&JournalCommand::PostEntry(PostJournalEntry {
                journal_id,
                entry_id: Uuid::now_v7(),
                lines: vec![
                    line(cash_account(), 1500, true),
                    line(sales_account(), 1500, false),
                ],
                description: Some("cash sale".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(events.len(), 1);
        let JournalEvent::EntryPosted(posted) = &events[0];
        assert_eq!(posted.journal_id, journal_id);
        assert_eq!(posted.lines.len(), 2);
        assert_eq!(posted.description.as_deref(), Some("cash sale"));
    }

    #[test]
    fn unbalanced_entry_is_rejected() {
        let journal_id = test_journal_id();
        let journal = Journal::empty(journal_id);

        let err = journal
            .handle(&JournalCommand::PostEntry(PostJournalEntry {
                journal_id,
                entry_id: Uuid::now_v7(),
                lines: vec![
                    line(cash_account(), 1500, true),
                    line(sales_account(), 1400, false),
                ],
                description: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn empty_entry_is_rejected() {
        let journal_id = test_journal_id();
        let journal = Journal::empty(journal_id);

        let err = journal
            .handle(&JournalCommand::PostEntry(PostJournalEntry {
                journal_id,
                entry_id: Uuid::now_v7(),
                lines: vec![],
                description: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let journal_id = test_journal_id();
        let journal = Journal::empty(journal_id);

        let err = journal
            .handle(&JournalCommand::PostEntry(PostJournalEntry {
                journal_id,
                entry_id: Uuid::now_v7(),
                lines: vec![
                    line(cash_account(), 0, true),
                    line(sales_account(), 0, false),
                ],
                description: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn apply_advances_version_and_marks_created() {
        let journal_id = test_journal_id();
        let mut journal = Journal::empty(journal_id);
        assert_eq!(journal.version(), 0);

        journal.apply(&JournalEvent::EntryPosted(JournalEntryPosted {
            journal_id,
            entry_id: Uuid::now_v7(),
            lines: vec![
                line(cash_account(), 100, true),
                line(sales_account(), 100, false),
            ],
            description: None,
            occurred_at: test_time(),
        }));

        assert_eq!(journal.version(), 1);
        assert_eq!(journal.id(), &journal_id);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn debits_equal_credits_in_posted_events(amounts in prop::collection::vec(1i64..=1_000_000, 1..8)) {
            let journal_id = test_journal_id();
            let journal = Journal::empty(journal_id);

            let total: i64 = amounts.iter().sum();
            let mut lines: Vec<JournalEntryLine> = amounts
                .iter()
                .map(|&amount| line(cash_account(), amount, true))
                .collect();
            lines.push(line(sales_account(), total, false));

            let events = journal
                .handle(&JournalCommand::PostEntry(PostJournalEntry {
                    journal_id,
                    entry_id: Uuid::now_v7(),
                    lines,
                    description: None,
                    occurred_at: test_time(),
                }))
                .unwrap();

            let JournalEvent::EntryPosted(posted) = &events[0];
            let debits: i128 = posted
                .lines
                .iter()
                .filter(|l| l.is_debit)
                .map(|l| i128::from(l.amount))
                .sum();
            let credits: i128 = posted
                .lines
                .iter()
                .filter(|l| !l.is_debit)
                .map(|l| i128::from(l.amount))
                .sum();
            prop_assert_eq!(debits, credits);
        }
    }
}
