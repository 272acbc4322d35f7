//! Production transactions: create, edit and delete finished / semi-finished goods.
//!
//! Each operation runs in one [`StockTransaction`]; any error rolls back the
//! produced row, the detail lines, every stock change and every ledger row
//! written so far.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use paintstock_core::{Document, DomainError, ItemId, ItemRef, Quantity, UserId};
use paintstock_inventory::{
    ConsumptionRecord, CreateItem, ProducedKind, ProductionRecord, ProductionSource, UnitPrices,
    resolve,
};
use paintstock_ledger::{Direction, DocumentRef, NewMovement};

use crate::config::InventoryConfig;
use crate::error::ServiceResult;
use crate::store::{InMemoryStockStore, StockTransaction};

/// Request: produce a new finished or semi-finished good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceGood {
    pub item_id: ItemId,
    pub kind: ProducedKind,
    pub name: String,
    pub prices: UnitPrices,
    pub declared_quantity: Decimal,
    pub source: ProductionSource,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Request: replace the inputs and declared quantity of an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditProduction {
    pub item_id: ItemId,
    pub declared_quantity: Decimal,
    pub source: ProductionSource,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProductionService {
    store: Arc<InMemoryStockStore>,
    config: InventoryConfig,
}

impl ProductionService {
    pub fn new(store: Arc<InMemoryStockStore>, config: InventoryConfig) -> Self {
        Self { store, config }
    }

    pub fn record(&self, item_id: ItemId) -> ServiceResult<ProductionRecord> {
        self.store
            .read(|state| state.production(item_id).cloned())?
            .ok_or_else(|| DomainError::not_found("production record", item_id).into())
    }

    fn validate_inputs(&self, declared: Decimal, source: &ProductionSource) -> ServiceResult<Quantity> {
        let declared = Quantity::positive(declared)?.ensure_scale(self.config.quantity_scale)?;
        source.validate(self.config.quantity_scale)?;
        Ok(declared)
    }

    /// Produce a good: resolve its inputs, create its row, consume the inputs
    /// and book the declared output.
    #[instrument(
        skip(self, request),
        fields(item_id = %request.item_id, kind = ?request.kind, declared = %request.declared_quantity),
        err
    )]
    pub fn create(&self, request: ProduceGood) -> ServiceResult<ProductionRecord> {
        let declared = self.validate_inputs(request.declared_quantity, &request.source)?;
        let produced = request.kind.item_ref(request.item_id);
        let reference = DocumentRef::production(produced)?;

        let mut tx = self.store.begin()?;
        if tx.production(request.item_id).is_some() {
            return Err(DomainError::duplicate_reference(format!(
                "production record {} already exists",
                request.item_id
            ))
            .into());
        }

        let resolved = resolve(&*tx, &request.source)?;

        tx.create_item(CreateItem {
            item: produced,
            name: request.name,
            supplier_id: None,
            prices: request.prices,
            occurred_at: request.occurred_at,
        })?;

        let consumption = consume(
            &mut tx,
            &resolved.consumption,
            request.user_id,
            reference,
            request.occurred_at,
        )?;

        tx.move_stock(NewMovement::production_in(
            produced,
            declared,
            request.user_id,
            reference,
            request.occurred_at,
        ))?;

        let record = ProductionRecord {
            id: request.item_id,
            kind: request.kind,
            declared_quantity: declared,
            source: request.source,
            details: resolved.details,
            consumption,
            produced_by: request.user_id,
            produced_at: request.occurred_at,
            updated_at: None,
        };
        tx.put_production(record.clone());
        tx.commit();

        tracing::info!(
            item = %produced,
            inputs = record.consumption.len(),
            "production recorded"
        );
        Ok(record)
    }

    /// Re-run a production record with new inputs.
    ///
    /// Previous consumption is returned to stock first, so the new inputs are
    /// checked against the restored quantities. The produced good moves by
    /// exactly `new - old` declared quantity.
    #[instrument(
        skip(self, request),
        fields(item_id = %request.item_id, declared = %request.declared_quantity),
        err
    )]
    pub fn edit(&self, request: EditProduction) -> ServiceResult<ProductionRecord> {
        let declared = self.validate_inputs(request.declared_quantity, &request.source)?;

        let mut tx = self.store.begin()?;
        let existing = tx
            .production(request.item_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("production record", request.item_id))?;
        let produced = existing.item_ref();
        let reference = DocumentRef::production(produced)?;

        if request.source.references(produced) {
            return Err(DomainError::validation(format!(
                "{produced} cannot consume itself"
            ))
            .into());
        }

        reverse_consumption(&mut tx, &existing, request.user_id, request.occurred_at)?;

        let resolved = resolve(&*tx, &request.source)?;
        let consumption = consume(
            &mut tx,
            &resolved.consumption,
            request.user_id,
            reference,
            request.occurred_at,
        )?;

        tx.move_stock(NewMovement::production_in(
            produced,
            declared,
            request.user_id,
            reference,
            request.occurred_at,
        ))?;
        tx.move_stock(
            NewMovement::adjustment(
                Direction::Out,
                produced,
                existing.declared_quantity,
                request.user_id,
                Some(reference),
                request.occurred_at,
            )
            .with_note("production edit: previous output"),
        )?;

        let record = ProductionRecord {
            declared_quantity: declared,
            source: request.source,
            details: resolved.details,
            consumption,
            updated_at: Some(request.occurred_at),
            ..existing
        };
        tx.put_production(record.clone());
        tx.commit();

        tracing::info!(item = %produced, "production record edited");
        Ok(record)
    }

    /// Undo a production record entirely and remove the produced good.
    ///
    /// Fails when the produced good is still referenced by another production
    /// record or a document, or when part of its output is no longer in stock.
    #[instrument(skip(self), err)]
    pub fn delete(
        &self,
        item_id: ItemId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<ProductionRecord> {
        let mut tx = self.store.begin()?;
        let existing = tx
            .production(item_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("production record", item_id))?;
        let produced = existing.item_ref();
        let reference = DocumentRef::production(produced)?;

        ensure_unreferenced(&tx, produced)?;

        reverse_consumption(&mut tx, &existing, user_id, occurred_at)?;
        tx.move_stock(
            NewMovement::adjustment(
                Direction::Out,
                produced,
                existing.declared_quantity,
                user_id,
                Some(reference),
                occurred_at,
            )
            .with_note("production deleted"),
        )?;
        tx.remove_item(produced)?;
        let removed = tx.remove_production(item_id)?;
        tx.commit();

        tracing::info!(item = %produced, "production record deleted");
        Ok(removed)
    }
}

/// Take every resolved input out of stock, one `PRODUCTION_OUT` per input.
fn consume(
    tx: &mut StockTransaction<'_>,
    inputs: &[(ItemRef, Quantity)],
    user_id: UserId,
    reference: DocumentRef,
    occurred_at: DateTime<Utc>,
) -> ServiceResult<Vec<ConsumptionRecord>> {
    let mut records = Vec::with_capacity(inputs.len());
    for (item, quantity) in inputs {
        let movement = tx.move_stock(NewMovement::production_out(
            *item,
            *quantity,
            user_id,
            reference,
            occurred_at,
        ))?;
        records.push(ConsumptionRecord {
            item: *item,
            quantity: *quantity,
            movement_id: movement.id,
        });
    }
    Ok(records)
}

/// Put back exactly what a record consumed.
fn reverse_consumption(
    tx: &mut StockTransaction<'_>,
    record: &ProductionRecord,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> ServiceResult<()> {
    let reference = DocumentRef::production(record.item_ref())?;
    for consumed in &record.consumption {
        tx.move_stock(
            NewMovement::adjustment(
                Direction::In,
                consumed.item,
                consumed.quantity,
                user_id,
                Some(reference),
                occurred_at,
            )
            .with_note(format!("reversal of movement {}", consumed.movement_id)),
        )?;
    }
    Ok(())
}

fn ensure_unreferenced(tx: &StockTransaction<'_>, produced: ItemRef) -> ServiceResult<()> {
    if let Some(other) = tx
        .productions()
        .values()
        .find(|r| r.id != produced.id && r.source.references(produced))
    {
        return Err(DomainError::validation(format!(
            "{produced} is an input of production record {}",
            other.id
        ))
        .into());
    }

    let in_purchase = tx
        .purchases()
        .values()
        .any(|p| p.lines().iter().any(|l| l.item == produced));
    let in_sale = tx
        .sales()
        .values()
        .any(|s| s.lines().iter().any(|l| l.item == produced));
    if in_purchase || in_sale {
        return Err(DomainError::validation(format!(
            "{produced} is referenced by a purchase or sale"
        ))
        .into());
    }
    Ok(())
}
