//! Optimistic mutation coordinator.
//!
//! Drives every remote operation for one collection:
//!
//! ```text
//! Idle -> OptimisticallyApplied -> Confirmed  -> Idle
//!                              \-> RolledBack -> Idle
//! ```
//!
//! The store is updated synchronously before the request goes out. Exactly
//! one of confirm or rollback runs once the gateway settles; a mutation whose
//! future is dropped first is rolled back. Errors arrive already classified
//! and are only forwarded.

use crate::collection::LoadingCategory;
use crate::command::MutationCommand;
use crate::inflight::InflightLocks;
use crate::notifications::NotificationSink;
use crate::store::EntityStore;
use std::future::Future;
use std::sync::Arc;
use tradedesk_core::{
    require_tenant, Entity, EntityAction, EntityGateway, EntityId, Page, TenantSource, TradeError,
    TradeResult,
};

pub struct MutationCoordinator<E: Entity> {
    store: EntityStore<E>,
    gateway: Arc<dyn EntityGateway<E>>,
    tenant: Arc<dyn TenantSource>,
    sink: Arc<dyn NotificationSink>,
    inflight: InflightLocks,
}

impl<E: Entity> Clone for MutationCoordinator<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
            tenant: Arc::clone(&self.tenant),
            sink: Arc::clone(&self.sink),
            inflight: self.inflight.clone(),
        }
    }
}

impl<E: Entity> MutationCoordinator<E> {
    pub fn new(
        store: EntityStore<E>,
        gateway: Arc<dyn EntityGateway<E>>,
        tenant: Arc<dyn TenantSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            gateway,
            tenant,
            sink,
            inflight: InflightLocks::new(),
        }
    }

    pub fn store(&self) -> &EntityStore<E> {
        &self.store
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Fetch the page described by the store's current filters.
    pub async fn fetch_list(&self) -> TradeResult<Page<E>> {
        let context = format!("Fetch {}", E::KIND.plural_label());
        self.ensure_tenant(&context)?;

        let _loading = self.store.begin(LoadingCategory::List);
        let query = self.store.read(|state| state.filters.clone());
        tracing::debug!(kind = %E::KIND, page = query.page, per_page = query.per_page, "fetching list");

        match self.gateway.list(&query).await {
            Ok(page) => {
                self.store.apply_page(page.clone());
                Ok(page)
            }
            Err(err) => Err(self.fail(err, &context)),
        }
    }

    /// Fetch one entity into the detail slot and refresh its list row.
    pub async fn fetch_one(&self, id: &EntityId) -> TradeResult<E> {
        let context = format!("Fetch {}", E::KIND.label());
        self.ensure_tenant(&context)?;

        let _loading = self.store.begin(LoadingCategory::Single);
        match self.gateway.get(id).await {
            Ok(entity) => {
                self.store.modify(|state| {
                    state.replace(entity.clone());
                    state.selected = Some(entity.clone());
                    state.error = None;
                });
                Ok(entity)
            }
            Err(err) => Err(self.fail(err, &context)),
        }
    }

    // ========================================================================
    // CONFIRMED MUTATIONS
    // ========================================================================

    /// Create on the server, then insert. Not optimistic: the id is
    /// server-assigned.
    pub async fn create(&self, draft: &E::Draft) -> TradeResult<E> {
        let context = format!("Create {}", E::KIND.label());
        self.ensure_tenant(&context)?;

        let _saving = self.store.begin(LoadingCategory::Save);
        match self.gateway.create(draft).await {
            Ok(entity) => {
                self.store.modify(|state| {
                    if !state.replace(entity.clone()) {
                        if state.filters.is_newest_first() {
                            state.items.insert(0, entity.clone());
                        } else {
                            state.items.push(entity.clone());
                        }
                        state.pagination.total_count += 1;
                    }
                    state.error = None;
                });
                tracing::info!(kind = %E::KIND, id = %entity.id(), "entity created");
                self.sink
                    .success(&format!("{} created successfully", E::KIND.label()));
                Ok(entity)
            }
            Err(err) => Err(self.fail(err, &context)),
        }
    }

    /// Apply one patch to many entities. Clears the selection on success.
    pub async fn bulk_update(&self, ids: &[EntityId], patch: &E::Patch) -> TradeResult<Vec<E>> {
        let context = format!("Update {}", E::KIND.plural_label());
        self.ensure_tenant(&context)?;

        let _saving = self.store.begin(LoadingCategory::Save);
        match self.gateway.bulk_update(ids, patch).await {
            Ok(updated) => {
                self.store.modify(|state| {
                    for entity in &updated {
                        state.replace(entity.clone());
                        state.replace_selected(entity);
                    }
                    state.selected_ids.clear();
                    state.error = None;
                });
                tracing::info!(kind = %E::KIND, count = updated.len(), "bulk update confirmed");
                self.sink.success(&format!(
                    "{} {} updated successfully",
                    updated.len(),
                    E::KIND.plural_label()
                ));
                Ok(updated)
            }
            Err(err) => Err(self.fail(err, &context)),
        }
    }

    // ========================================================================
    // OPTIMISTIC MUTATIONS
    // ========================================================================

    /// Patch locally, then confirm with the server's entity or roll back.
    pub async fn update(&self, id: &EntityId, patch: E::Patch) -> TradeResult<E> {
        let context = format!("Update {}", E::KIND.label());
        let remote = self.gateway.update(id, &patch);
        let command = MutationCommand::Update {
            id: id.clone(),
            patch: patch.clone(),
        };
        let entity = self.run(command, &context, remote, confirmed_entity).await?;

        tracing::info!(kind = %E::KIND, id = %id, "update confirmed");
        self.sink
            .success(&format!("{} updated successfully", E::KIND.label()));
        Ok(entity)
    }

    /// Remove locally, then confirm or reinsert at the original position.
    pub async fn delete(&self, id: &EntityId) -> TradeResult<()> {
        let context = format!("Delete {}", E::KIND.label());
        let remote = self.gateway.delete(id);
        let command = MutationCommand::Delete { id: id.clone() };
        self.run(command, &context, remote, nothing_to_merge).await?;

        tracing::info!(kind = %E::KIND, id = %id, "delete confirmed");
        self.sink
            .success(&format!("{} deleted successfully", E::KIND.label()));
        Ok(())
    }

    /// Status transition such as send, accept or complete.
    pub async fn transition(&self, id: &EntityId, action: E::Action) -> TradeResult<E> {
        let context = format!("{} {}", action.label(), E::KIND.label());
        let success = format!("{} {} successfully", E::KIND.label(), action.completed());
        let remote = self.gateway.perform(id, &action);
        let command = MutationCommand::Transition {
            id: id.clone(),
            action: action.clone(),
        };
        let entity = self.run(command, &context, remote, confirmed_entity).await?;

        tracing::info!(kind = %E::KIND, id = %id, action = action.segment(), "transition confirmed");
        self.sink.success(&success);
        Ok(entity)
    }

    /// The shared optimistic protocol. `remote` is not polled until the
    /// optimistic change is in place.
    async fn run<R, Fut>(
        &self,
        command: MutationCommand<E>,
        context: &str,
        remote: Fut,
        merge: fn(&R) -> Option<&E>,
    ) -> TradeResult<R>
    where
        Fut: Future<Output = TradeResult<R>>,
    {
        self.ensure_tenant(context)?;

        let id = command.id().clone();
        let _inflight = self.inflight.acquire(&id).await;
        let _saving = self.store.begin(LoadingCategory::Save);

        // Must drop before `_saving` and `_inflight`.
        let pending = match self.store.modify(|state| command.apply(state)) {
            Ok(snapshot) => self.store.pending(snapshot),
            Err(err) => return Err(self.fail(TradeError::from(err), context)),
        };
        tracing::debug!(kind = %E::KIND, id = %id, "optimistic change applied");

        match remote.await {
            Ok(output) => {
                pending.confirm(merge(&output));
                Ok(output)
            }
            Err(err) => {
                tracing::warn!(kind = %E::KIND, id = %id, error = %err, "rolling back optimistic change");
                pending.rollback();
                Err(self.fail(err, context))
            }
        }
    }

    fn ensure_tenant(&self, context: &str) -> TradeResult<()> {
        require_tenant(self.tenant.as_ref()).map(|_| ()).map_err(|err| {
            tracing::warn!(kind = %E::KIND, context, "operation rejected without tenant context");
            self.fail(TradeError::from(err), context)
        })
    }

    /// Record the error on the collection and report it exactly once.
    fn fail(&self, err: TradeError, context: &str) -> TradeError {
        self.store.set_error(Some(err.user_message()));
        self.sink.error(&err, context);
        err
    }
}

fn confirmed_entity<E>(entity: &E) -> Option<&E> {
    Some(entity)
}

fn nothing_to_merge<E>(_: &()) -> Option<&E> {
    None
}
