use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tadbir_core::{Aggregate, AggregateRoot, AggregateId, DomainError};
use tadbir_events::Event;
use tadbir_products::ProductId;
use tadbir_warehouses::WarehouseId;

/// Stock item identifier.
///
/// One stock item per (product, warehouse) pair; the pairing is fixed at
/// registration time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockItemId(pub AggregateId);

impl StockItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: StockItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    id: StockItemId,
    product_id: Option<ProductId>,
    warehouse_id: Option<WarehouseId>,
    on_hand: i64,
    version: u64,
    created: bool,
}

impl StockItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockItemId) -> Self {
        Self {
            id,
            product_id: None,
            warehouse_id: None,
            on_hand: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }
}

impl AggregateRoot for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterStockItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStockItem {
    pub item_id: StockItemId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub item_id: StockItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub item_id: StockItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CorrectStock.
///
/// Signed correction applied when a stock count is posted. `count_id` ties the
/// correction back to the originating count stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectStock {
    pub item_id: StockItemId,
    pub delta: i64,
    pub count_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockItemCommand {
    RegisterStockItem(RegisterStockItem),
    ReceiveStock(ReceiveStock),
    IssueStock(IssueStock),
    CorrectStock(CorrectStock),
}

/// Event: StockItemRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItemRegistered {
    pub item_id: StockItemId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub item_id: StockItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub item_id: StockItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockCorrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCorrected {
    pub item_id: StockItemId,
    pub delta: i64,
    pub count_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockItemEvent {
    StockItemRegistered(StockItemRegistered),
    StockReceived(StockReceived),
    StockIssued(StockIssued),
    StockCorrected(StockCorrected),
}

impl Event for StockItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockItemEvent::StockItemRegistered(_) => "inventory.stock.registered",
            StockItemEvent::StockReceived(_) => "inventory.stock.received",
            StockItemEvent::StockIssued(_) => "inventory.stock.issued",
            StockItemEvent::StockCorrected(_) => "inventory.stock.corrected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockItemEvent::StockItemRegistered(e) => e.occurred_at,
            StockItemEvent::StockReceived(e) => e.occurred_at,
            StockItemEvent::StockIssued(e) => e.occurred_at,
            StockItemEvent::StockCorrected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = StockItemCommand;
    type Event = StockItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockItemEvent::StockItemRegistered(e) => {
                self.id = e.item_id;
                self.product_id = Some(e.product_id);
                self.warehouse_id = Some(e.warehouse_id);
                self.on_hand = 0;
                self.created = true;
            }
            StockItemEvent::StockReceived(e) => {
                self.on_hand += e.quantity;
            }
            StockItemEvent::StockIssued(e) => {
                self.on_hand -= e.quantity;
            }
            StockItemEvent::StockCorrected(e) => {
                self.on_hand += e.delta;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockItemCommand::RegisterStockItem(cmd) => self.handle_register(cmd),
            StockItemCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            StockItemCommand::IssueStock(cmd) => self.handle_issue(cmd),
            StockItemCommand::CorrectStock(cmd) => self.handle_correct(cmd),
        }
    }
}

impl StockItem {
    fn ensure_item_id(&self, item_id: StockItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterStockItem) -> Result<Vec<StockItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("stock item already exists"));
        }

        Ok(vec![StockItemEvent::StockItemRegistered(StockItemRegistered {
            item_id: cmd.item_id,
            product_id: cmd.product_id,
            warehouse_id: cmd.warehouse_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_item_id(cmd.item_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![StockItemEvent::StockReceived(StockReceived {
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<StockItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_item_id(cmd.item_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if self.on_hand - cmd.quantity < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![StockItemEvent::StockIssued(StockIssued {
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_correct(&self, cmd: &CorrectStock) -> Result<Vec<StockItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_item_id(cmd.item_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        if self.on_hand + cmd.delta < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![StockItemEvent::StockCorrected(StockCorrected {
            item_id: cmd.item_id,
            delta: cmd.delta,
            count_id: cmd.count_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
