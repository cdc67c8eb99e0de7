//! Item store: the ordered chapter collection for one publishing run.

use bindery_shared::Item;

/// Owns the ordered Item Collection for the duration of one run.
///
/// Order is significant (it defines document section order) and is preserved
/// end-to-end. Phases stage their results into a separate vector and commit
/// through [`ItemStore::replace`], which swaps the whole collection at once;
/// there is no way to commit a partially processed collection.
///
/// A store belongs to exactly one pipeline run. Two runs never share one.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<Item>,
}

impl ItemStore {
    /// Create a store over an already-ordered collection.
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// The current collection, in document order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Atomically replace the collection with a phase's output.
    pub fn replace(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    /// Consume the store, yielding the final collection.
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
