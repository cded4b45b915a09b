//! Observable entity store.
//!
//! One [`EntityStore`] owns the [`CollectionState`] of one entity type. All
//! setters are synchronous, run under the watch channel's lock and notify
//! subscribers once per call, so readers never observe a partial write. No
//! network calls originate here.

use crate::collection::{CollectionState, LoadingCategory};
use crate::command::MutationSnapshot;
use crate::persistence::PersistedCollection;
use std::sync::Arc;
use tokio::sync::watch;
use tradedesk_core::{Entity, EntityId, FilterPatch, ListQuery, Page, PaginationMeta};

pub struct EntityStore<E> {
    state: Arc<watch::Sender<CollectionState<E>>>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    // ========================================================================
    // READ SIDE
    // ========================================================================

    /// Cloned copy of the current state.
    pub fn snapshot(&self) -> CollectionState<E> {
        self.state.borrow().clone()
    }

    /// Read without cloning the whole collection.
    pub fn read<R>(&self, f: impl FnOnce(&CollectionState<E>) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<CollectionState<E>> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<E> {
        self.read(|state| state.items.clone())
    }

    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.read(|state| state.get(id).cloned())
    }

    pub fn error(&self) -> Option<String> {
        self.read(|state| state.error.clone())
    }

    // ========================================================================
    // SETTERS
    // ========================================================================

    /// Replace the collection. `total_count` never drops below the item count
    /// and selection is pruned to the new items; nothing else is reset.
    pub fn set_items(&self, items: Vec<E>) {
        self.modify(|state| {
            state.items = items;
            state.sync_total_with_items();
            state.prune_selection();
            state.next_generation();
        });
    }

    pub fn set_selected(&self, entity: Option<E>) {
        self.modify(|state| state.selected = entity);
    }

    /// Toggle one id. Ids that are not in `items` are ignored.
    pub fn toggle_selection(&self, id: &EntityId) {
        self.modify(|state| {
            if !state.selected_ids.remove(id) && state.contains(id) {
                state.selected_ids.insert(id.clone());
            }
        });
    }

    /// Select every item on the current page.
    pub fn select_all(&self) {
        self.modify(|state| {
            state.selected_ids = state.items.iter().map(|item| item.id().clone()).collect();
        });
    }

    pub fn clear_selection(&self) {
        self.modify(|state| state.selected_ids.clear());
    }

    /// Merge filters. A page change moves `pagination.current_page` with it.
    pub fn set_filters(&self, patch: FilterPatch) {
        self.modify(|state| {
            patch.merge_into(&mut state.filters);
            if let Some(page) = patch.page {
                state.pagination.current_page = page;
            }
            if let Some(per_page) = patch.per_page {
                state.pagination.per_page = per_page;
            }
        });
    }

    pub fn clear_filters(&self) {
        self.modify(|state| {
            state.filters = ListQuery::default();
            state.pagination.current_page = state.filters.page;
            state.pagination.per_page = state.filters.per_page;
        });
    }

    /// Set all four pagination fields at once.
    pub fn set_pagination(&self, pagination: PaginationMeta) {
        self.modify(|state| {
            state.pagination = pagination;
            state.filters.page = pagination.current_page;
            state.filters.per_page = pagination.per_page;
            state.next_generation();
        });
    }

    pub fn set_error(&self, message: Option<String>) {
        self.modify(|state| state.error = message);
    }

    // ========================================================================
    // COORDINATOR SUPPORT
    // ========================================================================

    /// Apply a fetched page: items, pagination and cleared error together.
    pub(crate) fn apply_page(&self, page: Page<E>) {
        self.modify(|state| {
            state.items = page.data;
            state.pagination = page.pagination;
            state.filters.page = page.pagination.current_page;
            state.filters.per_page = page.pagination.per_page;
            state.sync_total_with_items();
            state.prune_selection();
            state.error = None;
            state.next_generation();
        });
    }

    /// Run `f` against the state under the channel lock.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut CollectionState<E>) -> R) -> R {
        let mut output = None;
        self.state.send_modify(|state| output = Some(f(state)));
        match output {
            Some(output) => output,
            None => unreachable!("send_modify always runs its closure"),
        }
    }

    /// Mark an operation of `category` as in flight until the guard drops.
    pub(crate) fn begin(&self, category: LoadingCategory) -> LoadingGuard<E> {
        self.modify(|state| state.loading.begin(category));
        LoadingGuard {
            store: self.clone(),
            category,
        }
    }

    /// Hold an applied optimistic change until it is confirmed or rolled
    /// back. Dropping the guard unsettled rolls the change back.
    pub(crate) fn pending(&self, snapshot: MutationSnapshot<E>) -> PendingMutation<E> {
        PendingMutation {
            store: self.clone(),
            snapshot: Some(snapshot),
        }
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    pub fn persisted(&self) -> PersistedCollection {
        self.read(|state| PersistedCollection {
            filters: state.filters.clone(),
            selected_ids: state.selected_ids.iter().cloned().collect(),
        })
    }

    /// Restore saved filters and selection. The selection is pruned against
    /// the next page that arrives.
    pub fn restore(&self, persisted: PersistedCollection) {
        self.modify(|state| {
            state.pagination.current_page = persisted.filters.page;
            state.pagination.per_page = persisted.filters.per_page;
            state.filters = persisted.filters;
            state.selected_ids = persisted.selected_ids.into_iter().collect();
        });
    }
}

/// Clears one loading flag on drop, including on early return or
/// cancellation of the owning future.
pub struct LoadingGuard<E: Entity> {
    store: EntityStore<E>,
    category: LoadingCategory,
}

impl<E: Entity> Drop for LoadingGuard<E> {
    fn drop(&mut self) {
        let category = self.category;
        self.store.modify(|state| state.loading.end(category));
    }
}

/// An optimistic change that has not settled yet. Exactly one of confirm or
/// rollback reaches the store, even when the owning future is dropped.
pub struct PendingMutation<E: Entity> {
    store: EntityStore<E>,
    snapshot: Option<MutationSnapshot<E>>,
}

impl<E: Entity> PendingMutation<E> {
    /// Merge the server's copy and clear the collection error.
    pub(crate) fn confirm(mut self, confirmed: Option<&E>) {
        if let Some(snapshot) = self.snapshot.take() {
            self.store.modify(|state| {
                snapshot.confirm(state, confirmed);
                state.error = None;
            });
        }
    }

    pub(crate) fn rollback(mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.store.modify(|state| snapshot.rollback(state));
        }
    }
}

impl<E: Entity> Drop for PendingMutation<E> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::warn!(
                kind = %E::KIND,
                id = %snapshot.id(),
                "mutation abandoned before the server answered; rolling back"
            );
            self.store.modify(|state| snapshot.rollback(state));
        }
    }
}
