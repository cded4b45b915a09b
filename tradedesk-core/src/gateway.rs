//! Gateway contract between collections and the remote API.

use crate::entity::Entity;
use crate::error::TradeResult;
use crate::query::{ListQuery, Page};
use crate::EntityId;
use async_trait::async_trait;

/// Tenant-scoped CRUD access to one entity collection.
///
/// Every call resolves the tenant first and fails with
/// [`crate::TenantContextError::Missing`] before any I/O when none is set.
/// Each call issues at most one request; failures are classified before
/// they are returned.
#[async_trait]
pub trait EntityGateway<E: Entity>: Send + Sync {
    async fn list(&self, query: &ListQuery) -> TradeResult<Page<E>>;

    async fn get(&self, id: &EntityId) -> TradeResult<E>;

    async fn create(&self, draft: &E::Draft) -> TradeResult<E>;

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> TradeResult<E>;

    async fn delete(&self, id: &EntityId) -> TradeResult<()>;

    /// Apply one patch to many entities; returns the updated entities.
    async fn bulk_update(&self, ids: &[EntityId], patch: &E::Patch) -> TradeResult<Vec<E>>;

    /// Run a status transition such as `POST /invoices/{id}/send`.
    async fn perform(&self, id: &EntityId, action: &E::Action) -> TradeResult<E>;
}
