use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tadbir_core::{Aggregate, AggregateRoot, AggregateId, DomainError, Entity, UserId};
use tadbir_events::Event;
use tadbir_products::ProductId;
use tadbir_warehouses::WarehouseId;

/// Stock count identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountId(pub AggregateId);

impl CountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Count status lifecycle (one-way: Draft → Posted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountStatus {
    Draft,
    Posted,
}

/// One product line in a stock count.
///
/// `counted` stays absent until a quantity is recorded for the line. The
/// variance is always derived from `system_qty` and `counted`; it is never
/// stored on its own, so the three can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLine {
    pub product_id: ProductId,
    /// Product name captured when the count was started (survives renames).
    pub product_name: String,
    /// Unit cost captured at count start; uncosted lines post without any
    /// journal impact.
    pub unit_cost: Option<u64>,
    /// Quantity on record for the warehouse when the count was started.
    pub system_qty: i64,
    /// Physically counted quantity; absent until recorded.
    pub counted: Option<i64>,
}

impl CountLine {
    pub fn is_counted(&self) -> bool {
        self.counted.is_some()
    }

    /// Counted quantity minus the quantity on record.
    ///
    /// An uncounted line has variance 0: until a quantity is recorded the
    /// line is assumed to match the records. Negative means shortage,
    /// positive means overage.
    pub fn variance(&self) -> i64 {
        self.counted.map(|c| c - self.system_qty).unwrap_or(0)
    }
}

impl Entity for CountLine {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }
}

/// Aggregate root: StockCount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCount {
    id: CountId,
    warehouse_id: Option<WarehouseId>,
    started_on: Option<NaiveDate>,
    status: CountStatus,
    lines: Vec<CountLine>,
    started_by: Option<UserId>,
    posted_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl StockCount {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CountId) -> Self {
        Self {
            id,
            warehouse_id: None,
            started_on: None,
            status: CountStatus::Draft,
            lines: Vec::new(),
            started_by: None,
            posted_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CountId {
        self.id
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn started_on(&self) -> Option<NaiveDate> {
        self.started_on
    }

    pub fn status(&self) -> CountStatus {
        self.status
    }

    pub fn lines(&self) -> &[CountLine] {
        &self.lines
    }

    pub fn started_by(&self) -> Option<UserId> {
        self.started_by
    }

    pub fn posted_by(&self) -> Option<UserId> {
        self.posted_by
    }

    /// Look up the line for a product, if it is part of this count.
    pub fn line(&self, product_id: ProductId) -> Option<&CountLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Invariant helper: counted quantities can only change while Draft.
    pub fn is_modifiable(&self) -> bool {
        self.status == CountStatus::Draft
    }
}

impl AggregateRoot for StockCount {
    type Id = CountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: StartCount.
///
/// Lines are seeded by the caller from the warehouse's stock-on-hand snapshot
/// (see `snapshot::seed_count_lines`); every line must start uncounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCount {
    pub count_id: CountId,
    pub warehouse_id: WarehouseId,
    pub started_on: NaiveDate,
    pub started_by: UserId,
    pub lines: Vec<CountLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordLineCount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLineCount {
    pub count_id: CountId,
    pub product_id: ProductId,
    /// New counted quantity; `None` clears a previously recorded value and
    /// returns the line to uncounted.
    pub counted: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PostCount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCount {
    pub count_id: CountId,
    pub posted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCountCommand {
    StartCount(StartCount),
    RecordLineCount(RecordLineCount),
    PostCount(PostCount),
}

/// Event: CountStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStarted {
    pub count_id: CountId,
    pub warehouse_id: WarehouseId,
    pub started_on: NaiveDate,
    pub started_by: UserId,
    pub lines: Vec<CountLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineCountRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCountRecorded {
    pub count_id: CountId,
    pub product_id: ProductId,
    pub counted: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CountPosted.
///
/// Carries the finalized lines: every `counted` is filled in (uncounted lines
/// assume their `system_qty`, so their variance is 0). Downstream consumers
/// never need to re-read the count stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPosted {
    pub count_id: CountId,
    pub warehouse_id: WarehouseId,
    pub lines: Vec<CountLine>,
    pub posted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCountEvent {
    CountStarted(CountStarted),
    LineCountRecorded(LineCountRecorded),
    CountPosted(CountPosted),
}

impl Event for StockCountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockCountEvent::CountStarted(_) => "stocktake.count.started",
            StockCountEvent::LineCountRecorded(_) => "stocktake.count.line_recorded",
            StockCountEvent::CountPosted(_) => "stocktake.count.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockCountEvent::CountStarted(e) => e.occurred_at,
            StockCountEvent::LineCountRecorded(e) => e.occurred_at,
            StockCountEvent::CountPosted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockCount {
    type Command = StockCountCommand;
    type Event = StockCountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockCountEvent::CountStarted(e) => {
                self.id = e.count_id;
                self.warehouse_id = Some(e.warehouse_id);
                self.started_on = Some(e.started_on);
                self.status = CountStatus::Draft;
                self.lines = e.lines.clone();
                self.started_by = Some(e.started_by);
                self.created = true;
            }
            StockCountEvent::LineCountRecorded(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == e.product_id) {
                    line.counted = e.counted;
                }
            }
            StockCountEvent::CountPosted(e) => {
                self.status = CountStatus::Posted;
                self.lines = e.lines.clone();
                self.posted_by = Some(e.posted_by);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCountCommand::StartCount(cmd) => self.handle_start(cmd),
            StockCountCommand::RecordLineCount(cmd) => self.handle_record(cmd),
            StockCountCommand::PostCount(cmd) => self.handle_post(cmd),
        }
    }
}

impl StockCount {
    fn ensure_count_id(&self, count_id: CountId) -> Result<(), DomainError> {
        if self.id != count_id {
            return Err(DomainError::invariant("count_id mismatch"));
        }
        Ok(())
    }

    fn handle_start(&self, cmd: &StartCount) -> Result<Vec<StockCountEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("count already exists"));
        }

        // Whether the warehouse is open is checked by the caller against the
        // warehouse directory; the aggregate only sees its id.

        let mut seen = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if line.product_name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
            if line.system_qty <= 0 {
                return Err(DomainError::validation(
                    "count lines must carry positive system stock",
                ));
            }
            if line.counted.is_some() {
                return Err(DomainError::validation("count lines must start uncounted"));
            }
            if seen.contains(&line.product_id) {
                return Err(DomainError::validation("duplicate product in count lines"));
            }
            seen.push(line.product_id);
        }

        // An empty line list is legal: counting an empty warehouse produces a
        // count that posts with no corrections.

        Ok(vec![StockCountEvent::CountStarted(CountStarted {
            count_id: cmd.count_id,
            warehouse_id: cmd.warehouse_id,
            started_on: cmd.started_on,
            started_by: cmd.started_by,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record(&self, cmd: &RecordLineCount) -> Result<Vec<StockCountEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_count_id(cmd.count_id)?;

        if self.status == CountStatus::Posted {
            return Err(DomainError::invariant("posted counts cannot be modified"));
        }

        if self.line(cmd.product_id).is_none() {
            return Err(DomainError::validation("product is not part of this count"));
        }

        if let Some(counted) = cmd.counted {
            if counted < 0 {
                return Err(DomainError::validation("counted quantity cannot be negative"));
            }
        }

        Ok(vec![StockCountEvent::LineCountRecorded(LineCountRecorded {
            count_id: cmd.count_id,
            product_id: cmd.product_id,
            counted: cmd.counted,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_post(&self, cmd: &PostCount) -> Result<Vec<StockCountEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_count_id(cmd.count_id)?;

        if self.status == CountStatus::Posted {
            return Err(DomainError::conflict("count is already posted"));
        }

        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| DomainError::invariant("count has no warehouse"))?;

        // Finalize: an uncounted line assumes the quantity on record, so it
        // posts with variance 0.
        let lines: Vec<CountLine> = self
            .lines
            .iter()
            .map(|line| CountLine {
                counted: Some(line.counted.unwrap_or(line.system_qty)),
                ..line.clone()
            })
            .collect();

        Ok(vec![StockCountEvent::CountPosted(CountPosted {
            count_id: cmd.count_id,
            warehouse_id,
            lines,
            posted_by: cmd.posted_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
