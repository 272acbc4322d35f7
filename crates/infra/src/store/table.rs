use std::collections::HashMap;

use paintstock_core::Entity;

/// In-memory table of entities keyed by their id.
#[derive(Debug, Clone)]
pub struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &E::Id) -> bool {
        self.rows.contains_key(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a row, returning the previous one.
    pub(crate) fn upsert(&mut self, entity: E) -> Option<E> {
        self.rows.insert(entity.id().clone(), entity)
    }

    pub(crate) fn remove(&mut self, id: &E::Id) -> Option<E> {
        self.rows.remove(id)
    }

    /// Put a row back to a previous state (`None` deletes it).
    pub(crate) fn restore(&mut self, id: E::Id, previous: Option<E>) {
        match previous {
            Some(row) => {
                self.rows.insert(id, row);
            }
            None => {
                self.rows.remove(&id);
            }
        }
    }
}
