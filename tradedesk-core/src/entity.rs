//! The entity contract shared by every collection type.

use crate::error::TransitionError;
use crate::{EntityId, TenantId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vendor,
    Product,
    Invoice,
    Quote,
    ProductionItem,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Vendor,
        EntityKind::Product,
        EntityKind::Invoice,
        EntityKind::Quote,
        EntityKind::ProductionItem,
    ];

    /// REST collection path, relative to the API base url.
    pub fn resource_path(&self) -> &'static str {
        match self {
            EntityKind::Vendor => "/vendors",
            EntityKind::Product => "/products",
            EntityKind::Invoice => "/invoices",
            EntityKind::Quote => "/quotes",
            EntityKind::ProductionItem => "/production-items",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Vendor => "Vendor",
            EntityKind::Product => "Product",
            EntityKind::Invoice => "Invoice",
            EntityKind::Quote => "Quote",
            EntityKind::ProductionItem => "Production Item",
        }
    }

    pub fn plural_label(&self) -> &'static str {
        match self {
            EntityKind::Vendor => "Vendors",
            EntityKind::Product => "Products",
            EntityKind::Invoice => "Invoices",
            EntityKind::Quote => "Quotes",
            EntityKind::ProductionItem => "Production Items",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tenant-owned record held in a client-side collection.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial update. Absent fields are left untouched.
    type Patch: Clone + fmt::Debug + Serialize + Send + Sync + 'static;
    /// Create payload.
    type Draft: Clone + fmt::Debug + Serialize + Send + Sync + 'static;
    /// Status transitions this entity supports.
    type Action: EntityAction<Self>;

    const KIND: EntityKind;

    fn id(&self) -> &EntityId;

    fn tenant_id(&self) -> TenantId;

    /// Shallow merge of the patch fields onto `self`.
    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// A server-side status transition, e.g. `POST /quotes/{id}/accept`.
pub trait EntityAction<E>: Clone + fmt::Debug + Send + Sync + 'static {
    /// Path segment appended to the entity url.
    fn segment(&self) -> &'static str;

    /// Imperative label, e.g. "Mark Paid" in "Mark Paid Invoice".
    fn label(&self) -> &'static str;

    /// Past form used in success messages, e.g. "marked as paid".
    fn completed(&self) -> &'static str;

    /// JSON request body.
    fn body(&self) -> serde_json::Value;

    /// Validate against the current entity and return its provisional state.
    fn apply_optimistic(&self, current: &E) -> Result<E, TransitionError>;
}

/// Action type for entities without status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoAction {}

impl<E> EntityAction<E> for NoAction {
    fn segment(&self) -> &'static str {
        match *self {}
    }

    fn label(&self) -> &'static str {
        match *self {}
    }

    fn completed(&self) -> &'static str {
        match *self {}
    }

    fn body(&self) -> serde_json::Value {
        match *self {}
    }

    fn apply_optimistic(&self, _current: &E) -> Result<E, TransitionError> {
        match *self {}
    }
}

/// Shared guard for status machines: `allowed` lists the legal source states.
pub(crate) fn guard_transition<S: PartialEq + fmt::Display>(
    kind: EntityKind,
    action: &'static str,
    current: &S,
    allowed: &[S],
) -> Result<(), TransitionError> {
    if allowed.contains(current) {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed {
            kind,
            action,
            from: current.to_string(),
        })
    }
}
