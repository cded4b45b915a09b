//! Tenant context: the ambient "which tenant am I acting for" value.
//!
//! Every outbound request carries a tenant id. The context is read through
//! [`TenantSource`] so callers can plug in whatever owns the session.

use crate::error::TenantContextError;
use crate::TenantId;
use std::sync::{Arc, RwLock};

/// Supplies the tenant for the current session, if one is established.
pub trait TenantSource: Send + Sync {
    fn tenant_id(&self) -> Option<TenantId>;
}

/// Resolve the tenant or fail with [`TenantContextError::Missing`].
pub fn require_tenant(source: &dyn TenantSource) -> Result<TenantId, TenantContextError> {
    source.tenant_id().ok_or(TenantContextError::Missing)
}

/// Reject access to an entity owned by another tenant.
pub fn ensure_same_tenant(expected: TenantId, found: TenantId) -> Result<(), TenantContextError> {
    if expected == found {
        Ok(())
    } else {
        Err(TenantContextError::Mismatch { expected, found })
    }
}

/// Shared, swappable tenant context (login/logout/tenant switch).
#[derive(Debug, Clone, Default)]
pub struct TenantHandle {
    current: Arc<RwLock<Option<TenantId>>>,
}

impl TenantHandle {
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self {
            current: Arc::new(RwLock::new(tenant_id)),
        }
    }

    pub fn set(&self, tenant_id: TenantId) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(tenant_id);
    }

    pub fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }
}

impl TenantSource for TenantHandle {
    fn tenant_id(&self) -> Option<TenantId> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl TenantSource for TenantId {
    fn tenant_id(&self) -> Option<TenantId> {
        Some(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_tracks_tenant_switches() {
        let handle = TenantHandle::default();
        assert_eq!(require_tenant(&handle), Err(TenantContextError::Missing));

        let tenant = TenantId::new_v4();
        handle.set(tenant);
        assert_eq!(require_tenant(&handle), Ok(tenant));

        let clone = handle.clone();
        clone.clear();
        assert!(handle.tenant_id().is_none());
    }

    #[test]
    fn mismatched_tenants_are_rejected() {
        let a = TenantId::new_v4();
        let b = TenantId::new_v4();
        assert!(ensure_same_tenant(a, a).is_ok());
        assert_eq!(
            ensure_same_tenant(a, b),
            Err(TenantContextError::Mismatch { expected: a, found: b })
        );
    }
}
