use std::sync::{Mutex, MutexGuard};

use crate::error::{ServiceError, ServiceResult};

use super::{StockState, StockTransaction};

/// In-memory stock store.
///
/// A single mutex guards all tables, so a [`StockTransaction`] is serializable
/// with respect to every other transaction and read.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: Mutex<StockState>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ServiceResult<MutexGuard<'_, StockState>> {
        self.state
            .lock()
            .map_err(|_| ServiceError::storage("stock store lock poisoned"))
    }

    /// Open a unit of work. It holds the store's lock until committed or dropped.
    pub fn begin(&self) -> ServiceResult<StockTransaction<'_>> {
        Ok(StockTransaction::new(self.lock()?))
    }

    /// Run a read-only closure against a consistent view of the store.
    pub fn read<R>(&self, f: impl FnOnce(&StockState) -> R) -> ServiceResult<R> {
        let state = self.lock()?;
        Ok(f(&state))
    }
}
