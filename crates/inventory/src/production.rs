//! Production records: a produced good, its bill-of-materials detail lines and
//! the consumption it booked against stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstock_core::{
    DomainError, DomainResult, Entity, ItemId, ItemKind, ItemRef, MovementId, Quantity, UserId,
};

/// What a production record produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducedKind {
    FinishedGood,
    SemiFinishedGood,
}

impl ProducedKind {
    pub fn item_kind(self) -> ItemKind {
        match self {
            ProducedKind::FinishedGood => ItemKind::FinishedGood,
            ProducedKind::SemiFinishedGood => ItemKind::SemiFinishedGood,
        }
    }

    pub fn item_ref(self, id: ItemId) -> ItemRef {
        ItemRef::new(self.item_kind(), id)
    }
}

impl TryFrom<ItemKind> for ProducedKind {
    type Error = DomainError;

    fn try_from(kind: ItemKind) -> Result<Self, Self::Error> {
        match kind {
            ItemKind::FinishedGood => Ok(ProducedKind::FinishedGood),
            ItemKind::SemiFinishedGood => Ok(ProducedKind::SemiFinishedGood),
            other => Err(DomainError::validation(format!("{other} is not produced"))),
        }
    }
}

/// One requested input: an item id and the quantity to consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
}

impl SourceLine {
    pub fn new(item_id: ItemId, quantity: Decimal) -> Self {
        Self { item_id, quantity }
    }
}

/// Where a production run takes its inputs from.
///
/// Exactly one source is chosen per record; raw materials and semi-finished
/// goods are never mixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "lines", rename_all = "snake_case")]
pub enum ProductionSource {
    RawMaterials(Vec<SourceLine>),
    SemiFinishedGoods(Vec<SourceLine>),
}

impl ProductionSource {
    pub fn lines(&self) -> &[SourceLine] {
        match self {
            ProductionSource::RawMaterials(lines) | ProductionSource::SemiFinishedGoods(lines) => {
                lines
            }
        }
    }

    /// The inventory table the source lines point into.
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ProductionSource::RawMaterials(_) => ItemKind::RawMaterial,
            ProductionSource::SemiFinishedGoods(_) => ItemKind::SemiFinishedGood,
        }
    }

    pub fn references(&self, item: ItemRef) -> bool {
        self.item_kind() == item.kind && self.lines().iter().any(|l| l.item_id == item.id)
    }

    /// Non-empty, positive quantities, at most `max_scale` decimal places.
    pub fn validate(&self, max_scale: u32) -> DomainResult<()> {
        if self.lines().is_empty() {
            return Err(DomainError::validation(
                "production source must list at least one input",
            ));
        }
        for line in self.lines() {
            Quantity::positive(line.quantity)?.ensure_scale(max_scale)?;
        }
        Ok(())
    }
}

/// Bill-of-materials detail line (`FinishedGoodDetail` / `SemiFinishedGoodDetail`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub raw_material_id: ItemId,
    pub quantity: Quantity,
}

/// Stock consumed by a production record, linked to the ledger row that booked it.
///
/// Edits and deletions reverse exactly these entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub item: ItemRef,
    pub quantity: Quantity,
    pub movement_id: MovementId,
}

/// A finished or semi-finished good as produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: ItemId,
    pub kind: ProducedKind,
    pub declared_quantity: Quantity,
    pub source: ProductionSource,
    pub details: Vec<BomLine>,
    pub consumption: Vec<ConsumptionRecord>,
    pub produced_by: UserId,
    pub produced_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductionRecord {
    pub fn item_ref(&self) -> ItemRef {
        self.kind.item_ref(self.id)
    }

    /// Detail quantity recorded for one raw material (zero if absent).
    pub fn detail_quantity(&self, raw_material_id: ItemId) -> Quantity {
        self.details
            .iter()
            .find(|d| d.raw_material_id == raw_material_id)
            .map(|d| d.quantity)
            .unwrap_or(Quantity::ZERO)
    }
}

impl Entity for ProductionRecord {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_source_is_rejected() {
        let err = ProductionSource::RawMaterials(vec![]).validate(4).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn source_quantities_must_be_positive_and_within_scale() {
        let id = ItemId::new();
        assert!(
            ProductionSource::RawMaterials(vec![SourceLine::new(id, dec!(-1))])
                .validate(4)
                .is_err()
        );
        assert!(
            ProductionSource::SemiFinishedGoods(vec![SourceLine::new(id, dec!(0.123))])
                .validate(2)
                .is_err()
        );
        assert!(
            ProductionSource::SemiFinishedGoods(vec![SourceLine::new(id, dec!(0.12))])
                .validate(2)
                .is_ok()
        );
    }

    #[test]
    fn references_checks_the_source_table() {
        let id = ItemId::new();
        let source = ProductionSource::SemiFinishedGoods(vec![SourceLine::new(id, dec!(1))]);
        assert!(source.references(ItemRef::semi_finished(id)));
        assert!(!source.references(ItemRef::raw_material(id)));
    }

    #[test]
    fn source_serializes_as_tagged_variant() {
        let id = ItemId::new();
        let source = ProductionSource::RawMaterials(vec![SourceLine::new(id, dec!(2))]);
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "raw_materials");
        assert_eq!(json["lines"][0]["quantity"], "2");
    }

    #[test]
    fn only_produced_kinds_convert() {
        assert_eq!(
            ProducedKind::try_from(ItemKind::SemiFinishedGood).unwrap(),
            ProducedKind::SemiFinishedGood
        );
        assert!(ProducedKind::try_from(ItemKind::Accessory).is_err());
    }
}
