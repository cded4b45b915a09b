//! Collection state for one entity type.

use std::collections::BTreeSet;
use tradedesk_core::{Entity, EntityId, ListQuery, PaginationMeta};

/// In-flight operation category. Each has its own loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingCategory {
    /// Paginated list fetch
    List,
    /// Single-entity fetch
    Single,
    /// Create, update, delete, transitions and bulk updates
    Save,
}

/// Loading flags kept as counters so overlapping operations of the same
/// category never clear each other's flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    list: u32,
    single: u32,
    save: u32,
}

impl LoadingFlags {
    pub fn is_loading(&self) -> bool {
        self.list > 0
    }

    pub fn is_fetching_one(&self) -> bool {
        self.single > 0
    }

    pub fn is_saving(&self) -> bool {
        self.save > 0
    }

    pub fn is_idle(&self) -> bool {
        self.list == 0 && self.single == 0 && self.save == 0
    }

    pub fn is_active(&self, category: LoadingCategory) -> bool {
        *self.counter(category) > 0
    }

    pub(crate) fn begin(&mut self, category: LoadingCategory) {
        *self.counter_mut(category) += 1;
    }

    pub(crate) fn end(&mut self, category: LoadingCategory) {
        let counter = self.counter_mut(category);
        *counter = counter.saturating_sub(1);
    }

    fn counter(&self, category: LoadingCategory) -> &u32 {
        match category {
            LoadingCategory::List => &self.list,
            LoadingCategory::Single => &self.single,
            LoadingCategory::Save => &self.save,
        }
    }

    fn counter_mut(&mut self, category: LoadingCategory) -> &mut u32 {
        match category {
            LoadingCategory::List => &mut self.list,
            LoadingCategory::Single => &mut self.single,
            LoadingCategory::Save => &mut self.save,
        }
    }
}

/// Client-side view of one entity collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<E> {
    pub items: Vec<E>,
    /// Detail view entity.
    pub selected: Option<E>,
    /// Always a subset of the ids in `items`.
    pub selected_ids: BTreeSet<EntityId>,
    pub filters: ListQuery,
    pub pagination: PaginationMeta,
    pub loading: LoadingFlags,
    /// Last classified error message.
    pub error: Option<String>,
    /// Bumped whenever the listed page is replaced wholesale.
    pub(crate) generation: u64,
}

impl<E> Default for CollectionState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            selected_ids: BTreeSet::new(),
            filters: ListQuery::default(),
            pagination: PaginationMeta::default(),
            loading: LoadingFlags::default(),
            error: None,
            generation: 0,
        }
    }
}

impl<E: Entity> CollectionState<E> {
    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    pub fn is_selected(&self, id: &EntityId) -> bool {
        self.selected_ids.contains(id)
    }

    /// Changes every time `items` or `pagination` is replaced by a new page.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn next_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Replace the item with the same id. Returns whether one was found.
    pub(crate) fn replace(&mut self, entity: E) -> bool {
        match self.position(entity.id()) {
            Some(index) => {
                self.items[index] = entity;
                true
            }
            None => false,
        }
    }

    /// Refresh the detail entity if it is the same record.
    pub(crate) fn replace_selected(&mut self, entity: &E) {
        if let Some(selected) = &mut self.selected {
            if selected.id() == entity.id() {
                *selected = entity.clone();
            }
        }
    }

    pub(crate) fn prune_selection(&mut self) {
        let ids: BTreeSet<&EntityId> = self.items.iter().map(|item| item.id()).collect();
        self.selected_ids.retain(|id| ids.contains(id));
    }

    pub(crate) fn sync_total_with_items(&mut self) {
        let len = self.items.len() as u64;
        if self.pagination.total_count < len {
            self.pagination.total_count = len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_counters_never_underflow() {
        let mut flags = LoadingFlags::default();
        flags.begin(LoadingCategory::Save);
        flags.begin(LoadingCategory::Save);
        flags.end(LoadingCategory::Save);
        assert!(flags.is_saving());

        flags.end(LoadingCategory::Save);
        flags.end(LoadingCategory::Save);
        assert!(!flags.is_saving());
        assert!(flags.is_idle());
    }

    #[test]
    fn categories_are_independent() {
        let mut flags = LoadingFlags::default();
        flags.begin(LoadingCategory::List);
        assert!(flags.is_loading());
        assert!(!flags.is_fetching_one());
        assert!(!flags.is_active(LoadingCategory::Save));
    }
}
