use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstock_core::{
    DocumentId, DomainError, DomainResult, Entity, ItemId, ItemKind, ItemRef, MovementId, Quantity,
    UserId,
};

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    PurchaseIn,
    SaleOut,
    ProductionIn,
    ProductionOut,
    ReturnIn,
    Adjustment,
}

impl MovementType {
    /// The direction implied by the type; `None` for `Adjustment`, which carries its own.
    pub fn fixed_direction(self) -> Option<Direction> {
        match self {
            MovementType::PurchaseIn | MovementType::ProductionIn | MovementType::ReturnIn => {
                Some(Direction::In)
            }
            MovementType::SaleOut | MovementType::ProductionOut => Some(Direction::Out),
            MovementType::Adjustment => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::PurchaseIn => "PURCHASE_IN",
            MovementType::SaleOut => "SALE_OUT",
            MovementType::ProductionIn => "PRODUCTION_IN",
            MovementType::ProductionOut => "PRODUCTION_OUT",
            MovementType::ReturnIn => "RETURN_IN",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn signed(self, quantity: Quantity) -> Decimal {
        match self {
            Direction::In => quantity.value(),
            Direction::Out => -quantity.value(),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

/// The document a movement originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DocumentRef {
    Purchase(DocumentId),
    Sale(DocumentId),
    FinishedGood(ItemId),
    SemiFinishedGood(ItemId),
}

impl DocumentRef {
    /// Reference to the production record behind a produced item.
    pub fn production(item: ItemRef) -> DomainResult<Self> {
        match item.kind {
            ItemKind::FinishedGood => Ok(DocumentRef::FinishedGood(item.id)),
            ItemKind::SemiFinishedGood => Ok(DocumentRef::SemiFinishedGood(item.id)),
            other => Err(DomainError::validation(format!(
                "{other} items have no production record"
            ))),
        }
    }
}

impl core::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DocumentRef::Purchase(id) => write!(f, "purchase:{id}"),
            DocumentRef::Sale(id) => write!(f, "sale:{id}"),
            DocumentRef::FinishedGood(id) => write!(f, "finished_good:{id}"),
            DocumentRef::SemiFinishedGood(id) => write!(f, "semi_finished_good:{id}"),
        }
    }
}

/// One immutable ledger row.
///
/// `quantity` is always positive; the sign is given by `direction`, which is
/// fixed by `movement_type` for everything except `ADJUSTMENT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub item: ItemRef,
    pub quantity: Quantity,
    pub user_id: UserId,
    pub reference: Option<DocumentRef>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> Decimal {
        self.direction.signed(self.quantity)
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A movement about to be booked (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub direction: Direction,
    pub item: ItemRef,
    pub quantity: Quantity,
    pub user_id: UserId,
    pub reference: Option<DocumentRef>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewMovement {
    fn typed(
        movement_type: MovementType,
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        reference: Option<DocumentRef>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            movement_type,
            direction: movement_type.fixed_direction().unwrap_or(Direction::In),
            item,
            quantity,
            user_id,
            reference,
            note: None,
            occurred_at,
        }
    }

    pub fn purchase_in(
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        purchase: DocumentId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::typed(
            MovementType::PurchaseIn,
            item,
            quantity,
            user_id,
            Some(DocumentRef::Purchase(purchase)),
            occurred_at,
        )
    }

    pub fn sale_out(
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        sale: DocumentId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::typed(
            MovementType::SaleOut,
            item,
            quantity,
            user_id,
            Some(DocumentRef::Sale(sale)),
            occurred_at,
        )
    }

    pub fn return_in(
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        sale: DocumentId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::typed(
            MovementType::ReturnIn,
            item,
            quantity,
            user_id,
            Some(DocumentRef::Sale(sale)),
            occurred_at,
        )
    }

    pub fn production_in(
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        produced: DocumentRef,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::typed(
            MovementType::ProductionIn,
            item,
            quantity,
            user_id,
            Some(produced),
            occurred_at,
        )
    }

    pub fn production_out(
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        produced: DocumentRef,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::typed(
            MovementType::ProductionOut,
            item,
            quantity,
            user_id,
            Some(produced),
            occurred_at,
        )
    }

    pub fn adjustment(
        direction: Direction,
        item: ItemRef,
        quantity: Quantity,
        user_id: UserId,
        reference: Option<DocumentRef>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            ..Self::typed(
                MovementType::Adjustment,
                item,
                quantity,
                user_id,
                reference,
                occurred_at,
            )
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The signed quantity change this movement books.
    pub fn delta(&self) -> Decimal {
        self.direction.signed(self.quantity)
    }

    /// Validate and assign an id.
    pub fn into_movement(self, id: MovementId) -> DomainResult<StockMovement> {
        if self.quantity.is_zero() {
            return Err(DomainError::validation("movement quantity must be positive"));
        }
        if let Some(expected) = self.movement_type.fixed_direction() {
            if expected != self.direction {
                return Err(DomainError::invariant(format!(
                    "{} movements must be {:?}",
                    self.movement_type, expected
                )));
            }
        }

        Ok(StockMovement {
            id,
            movement_type: self.movement_type,
            direction: self.direction,
            item: self.item,
            quantity: self.quantity,
            user_id: self.user_id,
            reference: self.reference,
            note: self.note,
            recorded_at: self.occurred_at,
        })
    }
}
