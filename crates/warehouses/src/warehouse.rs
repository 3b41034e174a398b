use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tadbir_core::{Aggregate, AggregateRoot, AggregateId, DomainError};
use tadbir_events::Event;

/// Warehouse identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(pub AggregateId);

impl WarehouseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Warehouse status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseStatus {
    Open,
    Closed,
}

/// Aggregate root: Warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warehouse {
    id: WarehouseId,
    name: String,
    code: String,
    status: WarehouseStatus,
    version: u64,
    created: bool,
}

impl Warehouse {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WarehouseId) -> Self {
        Self {
            id,
            name: String::new(),
            code: String::new(),
            status: WarehouseStatus::Open,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WarehouseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> WarehouseStatus {
        self.status
    }

    /// Invariant helper: whether this warehouse can hold stock movements.
    ///
    /// Closed warehouses cannot receive, issue or count stock.
    pub fn is_open(&self) -> bool {
        self.status == WarehouseStatus::Open
    }
}

impl AggregateRoot for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWarehouse {
    pub warehouse_id: WarehouseId,
    pub name: String,
    /// Short location code (e.g. "WH-MAIN").
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameWarehouse {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseWarehouse {
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseCommand {
    OpenWarehouse(OpenWarehouse),
    RenameWarehouse(RenameWarehouse),
    CloseWarehouse(CloseWarehouse),
}

/// Event: WarehouseOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseOpened {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRenamed {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseClosed {
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseEvent {
    WarehouseOpened(WarehouseOpened),
    WarehouseRenamed(WarehouseRenamed),
    WarehouseClosed(WarehouseClosed),
}

impl Event for WarehouseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WarehouseEvent::WarehouseOpened(_) => "warehouses.warehouse.opened",
            WarehouseEvent::WarehouseRenamed(_) => "warehouses.warehouse.renamed",
            WarehouseEvent::WarehouseClosed(_) => "warehouses.warehouse.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WarehouseEvent::WarehouseOpened(e) => e.occurred_at,
            WarehouseEvent::WarehouseRenamed(e) => e.occurred_at,
            WarehouseEvent::WarehouseClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Warehouse {
    type Command = WarehouseCommand;
    type Event = WarehouseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WarehouseEvent::WarehouseOpened(e) => {
                self.id = e.warehouse_id;
                self.name = e.name.clone();
                self.code = e.code.clone();
                self.status = WarehouseStatus::Open;
                self.created = true;
            }
            WarehouseEvent::WarehouseRenamed(e) => {
                self.name = e.name.clone();
            }
            WarehouseEvent::WarehouseClosed(_) => {
                self.status = WarehouseStatus::Closed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WarehouseCommand::OpenWarehouse(cmd) => self.handle_open(cmd),
            WarehouseCommand::RenameWarehouse(cmd) => self.handle_rename(cmd),
            WarehouseCommand::CloseWarehouse(cmd) => self.handle_close(cmd),
        }
    }
}

impl Warehouse {
    fn ensure_warehouse_id(&self, warehouse_id: WarehouseId) -> Result<(), DomainError> {
        if self.id != warehouse_id {
            return Err(DomainError::invariant("warehouse_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("warehouse already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }

        Ok(vec![WarehouseEvent::WarehouseOpened(WarehouseOpened {
            warehouse_id: cmd.warehouse_id,
            name: cmd.name.clone(),
            code: cmd.code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_warehouse_id(cmd.warehouse_id)?;

        if self.status == WarehouseStatus::Closed {
            return Err(DomainError::invariant("closed warehouses cannot be renamed"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![WarehouseEvent::WarehouseRenamed(WarehouseRenamed {
            warehouse_id: cmd.warehouse_id,
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_warehouse_id(cmd.warehouse_id)?;

        if self.status == WarehouseStatus::Closed {
            return Err(DomainError::conflict("warehouse is already closed"));
        }

        Ok(vec![WarehouseEvent::WarehouseClosed(WarehouseClosed {
            warehouse_id: cmd.warehouse_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tadbir_core::AggregateId;

    fn test_warehouse_id() -> WarehouseId {
        WarehouseId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn open_warehouse_emits_warehouse_opened_event() {
        let warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();
        let cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };

        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            WarehouseEvent::WarehouseOpened(e) => {
                assert_eq!(e.warehouse_id, warehouse_id);
                assert_eq!(e.name, "Main Warehouse");
                assert_eq!(e.code, "WH-MAIN");
            }
            _ => panic!("Expected WarehouseOpened event"),
        }
    }

    #[test]
    fn open_warehouse_rejects_empty_name() {
        let warehouse = Warehouse::empty(test_warehouse_id());
        let cmd = OpenWarehouse {
            warehouse_id: test_warehouse_id(),
            name: "   ".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };

        let err = warehouse.handle(&WarehouseCommand::OpenWarehouse(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn open_warehouse_rejects_empty_code() {
        let warehouse = Warehouse::empty(test_warehouse_id());
        let cmd = OpenWarehouse {
            warehouse_id: test_warehouse_id(),
            name: "Main Warehouse".to_string(),
            code: "".to_string(),
            occurred_at: test_time(),
        };

        let err = warehouse.handle(&WarehouseCommand::OpenWarehouse(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty code"),
        }
    }

    #[test]
    fn open_warehouse_rejects_duplicate_creation() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let cmd = OpenWarehouse {
            warehouse_id: test_warehouse_id(),
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };

        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(cmd.clone())).unwrap();
        warehouse.apply(&events[0]);

        let err = warehouse.handle(&WarehouseCommand::OpenWarehouse(cmd)).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate creation"),
        }
    }

    #[test]
    fn rename_warehouse_updates_name() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();

        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Old Name".to_string(),
            code: "WH-01".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);

        let rename_cmd = RenameWarehouse {
            warehouse_id,
            name: "New Name".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::RenameWarehouse(rename_cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            WarehouseEvent::WarehouseRenamed(e) => {
                assert_eq!(e.name, "New Name");
            }
            _ => panic!("Expected WarehouseRenamed event"),
        }

        warehouse.apply(&events[0]);
        assert_eq!(warehouse.name(), "New Name");
        assert_eq!(warehouse.code(), "WH-01");
    }

    #[test]
    fn rename_warehouse_rejects_closed_warehouse() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();

        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);

        let close_cmd = CloseWarehouse {
            warehouse_id,
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap();
        warehouse.apply(&events[0]);

        let rename_cmd = RenameWarehouse {
            warehouse_id,
            name: "New Name".to_string(),
            occurred_at: test_time(),
        };
        let err = warehouse.handle(&WarehouseCommand::RenameWarehouse(rename_cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation error for closed warehouse"),
        }
    }

    #[test]
    fn close_warehouse_prevents_stock_movements() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();

        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);
        assert!(warehouse.is_open());

        let close_cmd = CloseWarehouse {
            warehouse_id,
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            WarehouseEvent::WarehouseClosed(e) => {
                assert_eq!(e.warehouse_id, warehouse_id);
            }
            _ => panic!("Expected WarehouseClosed event"),
        }

        warehouse.apply(&events[0]);
        assert_eq!(warehouse.status(), WarehouseStatus::Closed);
        assert!(!warehouse.is_open());
    }

    #[test]
    fn close_warehouse_rejects_already_closed() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();

        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);

        let close_cmd = CloseWarehouse {
            warehouse_id,
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd.clone())).unwrap();
        warehouse.apply(&events[0]);

        let err = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for already closed warehouse"),
        }
    }

    #[test]
    fn close_warehouse_rejects_non_existent_warehouse() {
        let warehouse = Warehouse::empty(test_warehouse_id());
        let close_cmd = CloseWarehouse {
            warehouse_id: test_warehouse_id(),
            occurred_at: test_time(),
        };

        let err = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound error for non-existent warehouse"),
        }
    }

    #[test]
    fn version_increments_on_apply() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        assert_eq!(warehouse.version(), 0);

        let warehouse_id = test_warehouse_id();
        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);
        assert_eq!(warehouse.version(), 1);

        let close_cmd = CloseWarehouse {
            warehouse_id,
            occurred_at: test_time(),
        };
        let events = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap();
        warehouse.apply(&events[0]);
        assert_eq!(warehouse.version(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut warehouse = Warehouse::empty(test_warehouse_id());
        let warehouse_id = test_warehouse_id();
        let open_cmd = OpenWarehouse {
            warehouse_id,
            name: "Main Warehouse".to_string(),
            code: "WH-MAIN".to_string(),
            occurred_at: test_time(),
        };

        let events = warehouse.handle(&WarehouseCommand::OpenWarehouse(open_cmd)).unwrap();
        warehouse.apply(&events[0]);
        let initial_version = warehouse.version();
        let initial_status = warehouse.status();

        let close_cmd = CloseWarehouse {
            warehouse_id,
            occurred_at: test_time(),
        };

        let events1 = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd.clone())).unwrap();
        let events2 = warehouse.handle(&WarehouseCommand::CloseWarehouse(close_cmd)).unwrap();

        assert_eq!(warehouse.version(), initial_version);
        assert_eq!(warehouse.status(), initial_status);
        assert_eq!(events1, events2);
    }
}
