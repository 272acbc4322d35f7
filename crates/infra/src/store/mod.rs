//! Storage: the in-memory stock store and its unit of work.
//!
//! Every read the services perform goes through [`StockState`]; every write
//! goes through a [`StockTransaction`], which records an undo entry per write
//! and rolls all of them back unless it is committed.

mod in_memory;
mod table;
mod transaction;

pub use in_memory::InMemoryStockStore;
pub use table::Table;
pub use transaction::StockTransaction;

use paintstock_core::{DocumentId, ItemId, ItemRef};
use paintstock_inventory::{BomLine, BomSource, InventoryItem, ProducedKind, ProductionRecord};
use paintstock_ledger::{DocumentRef, StockMovement};
use paintstock_purchasing::Purchase;
use paintstock_sales::Sale;

/// Everything the store holds: the four inventory tables (one keyed table,
/// partitioned by `ItemRef::kind`), production records, documents and the
/// append-only movement ledger.
#[derive(Debug, Default)]
pub struct StockState {
    items: Table<InventoryItem>,
    productions: Table<ProductionRecord>,
    purchases: Table<Purchase>,
    sales: Table<Sale>,
    movements: Vec<StockMovement>,
}

impl StockState {
    pub fn item(&self, item: ItemRef) -> Option<&InventoryItem> {
        self.items.get(&item)
    }

    pub fn items(&self) -> &Table<InventoryItem> {
        &self.items
    }

    pub fn production(&self, id: ItemId) -> Option<&ProductionRecord> {
        self.productions.get(&id)
    }

    pub fn productions(&self) -> &Table<ProductionRecord> {
        &self.productions
    }

    pub fn purchase(&self, id: DocumentId) -> Option<&Purchase> {
        self.purchases.get(&id)
    }

    pub fn purchases(&self) -> &Table<Purchase> {
        &self.purchases
    }

    pub fn sale(&self, id: DocumentId) -> Option<&Sale> {
        self.sales.get(&id)
    }

    pub fn sales(&self) -> &Table<Sale> {
        &self.sales
    }

    /// The full ledger in booking order.
    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }

    pub fn movements_for_item(&self, item: ItemRef) -> impl Iterator<Item = &StockMovement> {
        self.movements.iter().filter(move |m| m.item == item)
    }

    pub fn movements_for_reference(
        &self,
        reference: DocumentRef,
    ) -> impl Iterator<Item = &StockMovement> {
        self.movements
            .iter()
            .filter(move |m| m.reference == Some(reference))
    }
}

impl BomSource for StockState {
    fn item(&self, item: ItemRef) -> Option<&InventoryItem> {
        self.items.get(&item)
    }

    fn recorded_bom(&self, semi_finished_id: ItemId) -> Option<&[BomLine]> {
        self.productions
            .get(&semi_finished_id)
            .filter(|r| r.kind == ProducedKind::SemiFinishedGood)
            .map(|r| r.details.as_slice())
    }
}
