//! Infrastructure layer: storage, units of work, services and configuration.
//!
//! The domain crates decide; this crate owns the transaction boundary. Every
//! public service operation is one all-or-nothing unit of work over the
//! [`InMemoryStockStore`](store::InMemoryStockStore).

pub mod config;
pub mod documents;
pub mod error;
pub mod production;
pub mod stock;
pub mod store;

mod integration_tests;

use std::sync::Arc;

pub use config::InventoryConfig;
pub use documents::DocumentService;
pub use error::{ServiceError, ServiceResult};
pub use production::{EditProduction, ProduceGood, ProductionService};
pub use stock::{Discrepancy, RegisterItem, StockService};
pub use store::{InMemoryStockStore, StockState, StockTransaction};

/// The three services wired to one shared store.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub stock: StockService,
    pub production: ProductionService,
    pub documents: DocumentService,
}

impl Inventory {
    pub fn new(store: Arc<InMemoryStockStore>, config: InventoryConfig) -> Self {
        Self {
            stock: StockService::new(store.clone(), config.clone()),
            production: ProductionService::new(store.clone(), config.clone()),
            documents: DocumentService::new(store, config),
        }
    }

    /// A fresh, empty in-memory inventory.
    pub fn in_memory(config: InventoryConfig) -> Self {
        Self::new(Arc::new(InMemoryStockStore::new()), config)
    }
}
