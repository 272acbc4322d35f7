use std::ops::Deref;
use std::sync::MutexGuard;

use paintstock_core::aggregate::execute;
use paintstock_core::{DocumentId, DomainError, Entity, ItemId, ItemRef, MovementId};
use paintstock_inventory::{
    AdjustStock, CreateItem, InventoryCommand, InventoryItem, ProductionRecord,
};
use paintstock_ledger::{NewMovement, StockMovement};
use paintstock_purchasing::Purchase;
use paintstock_sales::Sale;

use crate::error::ServiceResult;

use super::StockState;

/// How to put one write back.
#[derive(Debug)]
enum Undo {
    Item(ItemRef, Option<InventoryItem>),
    Production(ItemId, Option<ProductionRecord>),
    Purchase(DocumentId, Option<Purchase>),
    Sale(DocumentId, Option<Sale>),
    Movement,
}

/// Unit of work over the in-memory store.
///
/// Holds the store's lock for its whole lifetime. Writes are applied in place
/// and logged; dropping the transaction without calling [`commit`](Self::commit)
/// replays the log backwards, so a failed operation leaves no trace.
///
/// Quantities can only change through [`move_stock`](Self::move_stock), which
/// books the matching ledger row in the same step.
pub struct StockTransaction<'a> {
    state: MutexGuard<'a, StockState>,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> StockTransaction<'a> {
    pub(super) fn new(state: MutexGuard<'a, StockState>) -> Self {
        Self {
            state,
            undo: Vec::new(),
            committed: false,
        }
    }

    /// Create an inventory row at quantity zero.
    pub fn create_item(&mut self, cmd: CreateItem) -> ServiceResult<InventoryItem> {
        let mut item = self
            .state
            .items
            .get(&cmd.item)
            .cloned()
            .unwrap_or_else(|| InventoryItem::empty(cmd.item));
        execute(&mut item, &InventoryCommand::CreateItem(cmd))?;
        self.put_item(item.clone());
        Ok(item)
    }

    /// Delete an inventory row. Only empty rows can be removed, so no quantity
    /// disappears without a ledger entry.
    pub fn remove_item(&mut self, item: ItemRef) -> ServiceResult<InventoryItem> {
        let existing = self
            .state
            .items
            .get(&item)
            .ok_or_else(|| DomainError::not_found(item.kind.as_str(), item.id))?;
        if !existing.quantity().is_zero() {
            return Err(DomainError::validation(format!(
                "'{}' still holds {} in stock",
                existing.name(),
                existing.quantity()
            ))
            .into());
        }
        let removed = self.state.items.remove(&item);
        self.undo.push(Undo::Item(item, removed.clone()));
        removed.ok_or_else(|| DomainError::not_found(item.kind.as_str(), item.id).into())
    }

    /// Apply a movement's delta to its item and append it to the ledger.
    ///
    /// Fails with `NotFound` for an unknown item and `InsufficientStock` when
    /// the item would go negative; nothing is written in either case.
    pub fn move_stock(&mut self, movement: NewMovement) -> ServiceResult<StockMovement> {
        let booked = movement.into_movement(MovementId::new())?;

        let mut item = self
            .state
            .items
            .get(&booked.item)
            .cloned()
            .ok_or_else(|| DomainError::not_found(booked.item.kind.as_str(), booked.item.id))?;
        execute(
            &mut item,
            &InventoryCommand::AdjustStock(AdjustStock {
                item: booked.item,
                delta: booked.signed_quantity(),
                occurred_at: booked.recorded_at,
            }),
        )?;

        tracing::debug!(
            movement_id = %booked.id,
            movement_type = %booked.movement_type,
            item = %booked.item,
            delta = %booked.signed_quantity(),
            quantity_after = %item.quantity(),
            "stock moved"
        );

        self.put_item(item);
        self.state.movements.push(booked.clone());
        self.undo.push(Undo::Movement);
        Ok(booked)
    }

    pub fn put_production(&mut self, record: ProductionRecord) {
        let id = record.id;
        let previous = self.state.productions.upsert(record);
        self.undo.push(Undo::Production(id, previous));
    }

    pub fn remove_production(&mut self, id: ItemId) -> ServiceResult<ProductionRecord> {
        let removed = self
            .state
            .productions
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("production record", id))?;
        self.undo.push(Undo::Production(id, Some(removed.clone())));
        Ok(removed)
    }

    pub fn put_purchase(&mut self, purchase: Purchase) {
        let id = *purchase.id();
        let previous = self.state.purchases.upsert(purchase);
        self.undo.push(Undo::Purchase(id, previous));
    }

    pub fn put_sale(&mut self, sale: Sale) {
        let id = *sale.id();
        let previous = self.state.sales.upsert(sale);
        self.undo.push(Undo::Sale(id, previous));
    }

    /// Make every write of this transaction permanent and release the lock.
    pub fn commit(mut self) {
        self.committed = true;
        tracing::debug!(writes = self.undo.len(), "transaction committed");
    }

    fn put_item(&mut self, item: InventoryItem) {
        let id = item.item_ref();
        let previous = self.state.items.upsert(item);
        self.undo.push(Undo::Item(id, previous));
    }

    fn rollback(&mut self) {
        let state = &mut *self.state;
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Item(id, previous) => state.items.restore(id, previous),
                Undo::Production(id, previous) => state.productions.restore(id, previous),
                Undo::Purchase(id, previous) => state.purchases.restore(id, previous),
                Undo::Sale(id, previous) => state.sales.restore(id, previous),
                Undo::Movement => {
                    state.movements.pop();
                }
            }
        }
    }
}

impl Deref for StockTransaction<'_> {
    type Target = StockState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl Drop for StockTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.undo.is_empty() {
            tracing::debug!(writes = self.undo.len(), "rolling back transaction");
            self.rollback();
        }
    }
}

impl core::fmt::Debug for StockTransaction<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockTransaction")
            .field("pending_writes", &self.undo.len())
            .field("committed", &self.committed)
            .finish()
    }
}
