//! Item registration, manual adjustments, ledger queries and reconciliation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use paintstock_core::{DomainError, ItemRef, Quantity, SupplierId, UserId};
use paintstock_inventory::{CreateItem, InventoryItem, UnitPrices};
use paintstock_ledger::{
    Direction, DocumentRef, MovementType, NewMovement, StockMovement, net_by_item, net_by_type,
    net_for_reference,
};

use crate::config::InventoryConfig;
use crate::error::ServiceResult;
use crate::store::InMemoryStockStore;

/// Request: add a row to one of the inventory tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub item: ItemRef,
    pub name: String,
    pub supplier_id: Option<SupplierId>,
    pub prices: UnitPrices,
    /// Booked as an inbound `ADJUSTMENT` when present and non-zero.
    pub opening_quantity: Option<Decimal>,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// An item whose stored quantity disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub item: ItemRef,
    pub stored: Decimal,
    pub ledger: Decimal,
}

#[derive(Debug, Clone)]
pub struct StockService {
    store: Arc<InMemoryStockStore>,
    config: InventoryConfig,
}

impl StockService {
    pub fn new(store: Arc<InMemoryStockStore>, config: InventoryConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self, request), fields(item = %request.item), err)]
    pub fn register_item(&self, request: RegisterItem) -> ServiceResult<InventoryItem> {
        let opening = match request.opening_quantity {
            Some(q) => Quantity::new(q)?.ensure_scale(self.config.quantity_scale)?,
            None => Quantity::ZERO,
        };

        let mut tx = self.store.begin()?;
        tx.create_item(CreateItem {
            item: request.item,
            name: request.name,
            supplier_id: request.supplier_id,
            prices: request.prices,
            occurred_at: request.occurred_at,
        })?;

        if !opening.is_zero() {
            tx.move_stock(
                NewMovement::adjustment(
                    Direction::In,
                    request.item,
                    opening,
                    request.user_id,
                    None,
                    request.occurred_at,
                )
                .with_note("opening balance"),
            )?;
        }

        let item = tx
            .item(request.item)
            .cloned()
            .ok_or_else(|| DomainError::not_found(request.item.kind.as_str(), request.item.id))?;
        tx.commit();

        tracing::info!(item = %request.item, quantity = %item.quantity(), "item registered");
        Ok(item)
    }

    /// Book a stock-take correction. The sign of `delta` gives the direction.
    #[instrument(skip(self, note), err)]
    pub fn adjust_stock(
        &self,
        item: ItemRef,
        delta: Decimal,
        note: impl Into<String>,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<StockMovement> {
        if delta.is_zero() {
            return Err(DomainError::validation("adjustment cannot be zero").into());
        }
        let direction = if delta.is_sign_negative() {
            Direction::Out
        } else {
            Direction::In
        };
        let quantity = Quantity::new(delta.abs())?.ensure_scale(self.config.quantity_scale)?;

        let mut tx = self.store.begin()?;
        let movement = tx.move_stock(
            NewMovement::adjustment(direction, item, quantity, user_id, None, occurred_at)
                .with_note(note),
        )?;
        tx.commit();

        tracing::info!(item = %item, delta = %delta, "stock adjusted");
        Ok(movement)
    }

    pub fn item(&self, item: ItemRef) -> ServiceResult<InventoryItem> {
        self.store
            .read(|state| state.item(item).cloned())?
            .ok_or_else(|| DomainError::not_found(item.kind.as_str(), item.id).into())
    }

    pub fn quantity(&self, item: ItemRef) -> ServiceResult<Quantity> {
        Ok(self.item(item)?.quantity())
    }

    /// Ledger rows for one item, oldest first.
    pub fn movements_for_item(&self, item: ItemRef) -> ServiceResult<Vec<StockMovement>> {
        self.store
            .read(|state| state.movements_for_item(item).cloned().collect())
    }

    /// Ledger rows that reference a document or production record, oldest first.
    pub fn movements_for_document(
        &self,
        reference: DocumentRef,
    ) -> ServiceResult<Vec<StockMovement>> {
        self.store
            .read(|state| state.movements_for_reference(reference).cloned().collect())
    }

    /// Signed net quantity per item moved by one document.
    pub fn net_for_document(
        &self,
        reference: DocumentRef,
    ) -> ServiceResult<BTreeMap<ItemRef, Decimal>> {
        self.store
            .read(|state| net_for_reference(state.movements(), reference))
    }

    /// Signed net quantity per movement type across the whole ledger.
    pub fn totals_by_type(&self) -> ServiceResult<BTreeMap<MovementType, Decimal>> {
        self.store.read(|state| net_by_type(state.movements()))
    }

    /// Compare every stored quantity with the sum of its ledger rows.
    ///
    /// Items that no longer exist must net to zero in the ledger.
    #[instrument(skip(self), err)]
    pub fn reconcile(&self) -> ServiceResult<Vec<Discrepancy>> {
        let discrepancies = self.store.read(|state| {
            let mut ledger = net_by_item(state.movements());
            let mut found = Vec::new();

            for item in state.items().values() {
                let expected = ledger.remove(&item.item_ref()).unwrap_or(Decimal::ZERO);
                if expected != item.quantity().value() {
                    found.push(Discrepancy {
                        item: item.item_ref(),
                        stored: item.quantity().value(),
                        ledger: expected,
                    });
                }
            }
            for (item, net) in ledger {
                if !net.is_zero() {
                    found.push(Discrepancy {
                        item,
                        stored: Decimal::ZERO,
                        ledger: net,
                    });
                }
            }

            found.sort_by_key(|d| d.item);
            found
        })?;

        for d in &discrepancies {
            tracing::warn!(item = %d.item, stored = %d.stored, ledger = %d.ledger, "stock out of balance");
        }
        Ok(discrepancies)
    }
}
