//! Inventory domain module.
//!
//! This crate contains the business rules for stock-carrying items, production
//! records and bill-of-materials expansion, implemented purely as deterministic
//! domain logic (no IO, no storage).

pub mod bom;
pub mod item;
pub mod production;

pub use bom::{BomSource, ResolvedBom, resolve};
pub use item::{
    AdjustStock, CreateItem, InventoryCommand, InventoryEvent, InventoryItem, ItemCreated,
    StockAdjusted, UnitPrices,
};
pub use production::{
    BomLine, ConsumptionRecord, ProducedKind, ProductionRecord, ProductionSource, SourceLine,
};
