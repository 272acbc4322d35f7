use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstock_core::{
    Aggregate, AggregateRoot, DomainError, Entity, Event, ItemKind, ItemRef, Quantity, SupplierId,
};

/// Optional unit prices carried by every inventory table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrices {
    pub purchase: Option<Decimal>,
    pub selling: Option<Decimal>,
}

impl UnitPrices {
    fn validate(&self) -> Result<(), DomainError> {
        for price in [self.purchase, self.selling].into_iter().flatten() {
            if price < Decimal::ZERO {
                return Err(DomainError::validation("unit price cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Aggregate root: InventoryItem.
///
/// One row of one of the four inventory tables. The quantity is only ever
/// changed through `AdjustStock`, which refuses any delta that would take it
/// below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    item: ItemRef,
    name: String,
    supplier_id: Option<SupplierId>,
    prices: UnitPrices,
    quantity: Quantity,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(item: ItemRef) -> Self {
        Self {
            item,
            name: String::new(),
            supplier_id: None,
            prices: UnitPrices::default(),
            quantity: Quantity::ZERO,
            version: 0,
            created: false,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        self.item
    }

    pub fn kind(&self) -> ItemKind {
        self.item.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn prices(&self) -> &UnitPrices {
        &self.prices
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Fail with `InsufficientStock` unless `requested` can be taken out.
    pub fn ensure_available(&self, requested: Quantity) -> Result<(), DomainError> {
        if self.quantity < requested {
            return Err(DomainError::insufficient_stock(
                self.name.clone(),
                self.quantity.value(),
                requested.value(),
            ));
        }
        Ok(())
    }
}

impl Entity for InventoryItem {
    type Id = ItemRef;

    fn id(&self) -> &Self::Id {
        &self.item
    }
}

impl AggregateRoot for InventoryItem {
    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub item: ItemRef,
    pub name: String,
    pub supplier_id: Option<SupplierId>,
    pub prices: UnitPrices,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (signed delta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub item: ItemRef,
    pub delta: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateItem(CreateItem),
    AdjustStock(AdjustStock),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item: ItemRef,
    pub name: String,
    pub supplier_id: Option<SupplierId>,
    pub prices: UnitPrices,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item: ItemRef,
    pub delta: Decimal,
    pub quantity_after: Quantity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    StockAdjusted(StockAdjusted),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.item = e.item;
                self.name = e.name.clone();
                self.supplier_id = e.supplier_id;
                self.prices = e.prices.clone();
                self.quantity = Quantity::ZERO;
                self.created = true;
            }
            InventoryEvent::StockAdjusted(e) => {
                self.quantity = e.quantity_after;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateItem(cmd) => self.handle_create(cmd),
            InventoryCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_item(&self, item: ItemRef) -> Result<(), DomainError> {
        if self.item != item {
            return Err(DomainError::invariant("item reference mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_reference(format!(
                "item {} already exists",
                cmd.item
            )));
        }
        self.ensure_item(cmd.item)?;
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.supplier_id.is_some() && !cmd.item.kind.is_supplied() {
            return Err(DomainError::validation(format!(
                "{} items cannot have a supplier",
                cmd.item.kind
            )));
        }
        cmd.prices.validate()?;

        Ok(vec![InventoryEvent::ItemCreated(ItemCreated {
            item: cmd.item,
            name: cmd.name.trim().to_string(),
            supplier_id: cmd.supplier_id,
            prices: cmd.prices.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(cmd.item.kind.as_str(), cmd.item.id));
        }
        self.ensure_item(cmd.item)?;

        if cmd.delta.is_zero() {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let Some(quantity_after) = self.quantity.apply_delta(cmd.delta) else {
            return Err(DomainError::insufficient_stock(
                self.name.clone(),
                self.quantity.value(),
                -cmd.delta,
            ));
        };

        Ok(vec![InventoryEvent::StockAdjusted(StockAdjusted {
            item: cmd.item,
            delta: cmd.delta,
            quantity_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}
