//! Application context: one coordinator per entity collection.
//!
//! Owns every collection store and hands out handles; nothing is reachable
//! through globals.

use crate::coordinator::MutationCoordinator;
use crate::notifications::NotificationSink;
use crate::persistence::{self, PersistedState, PersistenceError};
use crate::store::EntityStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tradedesk_client::{ClientConfig, ClientError, HttpTransport, RestGateway};
use tradedesk_core::{
    Entity, EntityGateway, EntityKind, Invoice, Product, ProductionItem, Quote, TenantHandle,
    TenantSource, Vendor,
};

/// One gateway per collection.
pub struct Gateways {
    pub vendors: Arc<dyn EntityGateway<Vendor>>,
    pub products: Arc<dyn EntityGateway<Product>>,
    pub invoices: Arc<dyn EntityGateway<Invoice>>,
    pub quotes: Arc<dyn EntityGateway<Quote>>,
    pub production: Arc<dyn EntityGateway<ProductionItem>>,
}

impl Gateways {
    /// REST gateways sharing one HTTP transport.
    pub fn rest(transport: HttpTransport, tenant: Arc<dyn TenantSource>) -> Self {
        fn gateway<E: Entity>(
            transport: &HttpTransport,
            tenant: &Arc<dyn TenantSource>,
        ) -> Arc<dyn EntityGateway<E>> {
            Arc::new(RestGateway::<E>::new(transport.clone(), Arc::clone(tenant)))
        }

        Self {
            vendors: gateway(&transport, &tenant),
            products: gateway(&transport, &tenant),
            invoices: gateway(&transport, &tenant),
            quotes: gateway(&transport, &tenant),
            production: gateway(&transport, &tenant),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub tenant: TenantHandle,
    pub vendors: MutationCoordinator<Vendor>,
    pub products: MutationCoordinator<Product>,
    pub invoices: MutationCoordinator<Invoice>,
    pub quotes: MutationCoordinator<Quote>,
    pub production: MutationCoordinator<ProductionItem>,
    persistence_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(tenant: TenantHandle, gateways: Gateways, sink: Arc<dyn NotificationSink>) -> Self {
        let source: Arc<dyn TenantSource> = Arc::new(tenant.clone());

        Self {
            vendors: coordinator(gateways.vendors, &source, &sink),
            products: coordinator(gateways.products, &source, &sink),
            invoices: coordinator(gateways.invoices, &source, &sink),
            quotes: coordinator(gateways.quotes, &source, &sink),
            production: coordinator(gateways.production, &source, &sink),
            tenant,
            persistence_path: None,
        }
    }

    /// Build REST-backed collections from a validated config.
    pub fn from_config(
        config: &ClientConfig,
        tenant: TenantHandle,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        let gateways = Gateways::rest(transport, Arc::new(tenant.clone()));
        tracing::debug!(base_url = %config.api_base_url, "application context ready");
        Ok(Self::new(tenant, gateways, sink).with_persistence_path(config.persistence_path.clone()))
    }

    pub fn with_persistence_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_path = Some(path.into());
        self
    }

    pub fn persistence_path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }

    /// Current filters and selection of every collection.
    pub fn preferences(&self) -> PersistedState {
        let mut state = PersistedState {
            tenant_id: self.tenant.tenant_id(),
            ..PersistedState::default()
        };
        state
            .collections
            .insert(EntityKind::Vendor, self.vendors.store().persisted());
        state
            .collections
            .insert(EntityKind::Product, self.products.store().persisted());
        state
            .collections
            .insert(EntityKind::Invoice, self.invoices.store().persisted());
        state
            .collections
            .insert(EntityKind::Quote, self.quotes.store().persisted());
        state
            .collections
            .insert(EntityKind::ProductionItem, self.production.store().persisted());
        state
    }

    /// Apply saved preferences. Preferences saved for a different tenant are
    /// ignored. Returns whether anything was applied.
    pub fn apply_preferences(&self, mut saved: PersistedState) -> bool {
        let current = self.tenant.tenant_id();
        if saved.tenant_id.is_none() || saved.tenant_id != current {
            tracing::warn!("ignoring preferences saved for another tenant");
            return false;
        }

        for (kind, collection) in std::mem::take(&mut saved.collections) {
            match kind {
                EntityKind::Vendor => self.vendors.store().restore(collection),
                EntityKind::Product => self.products.store().restore(collection),
                EntityKind::Invoice => self.invoices.store().restore(collection),
                EntityKind::Quote => self.quotes.store().restore(collection),
                EntityKind::ProductionItem => self.production.store().restore(collection),
            }
        }
        true
    }

    /// Save preferences to the configured path. A no-op without one.
    pub fn save_preferences(&self) -> Result<(), PersistenceError> {
        match &self.persistence_path {
            Some(path) => persistence::save(path, &self.preferences()),
            None => Ok(()),
        }
    }

    /// Load and apply preferences from the configured path.
    pub fn restore_preferences(&self) -> Result<bool, PersistenceError> {
        let Some(path) = &self.persistence_path else {
            return Ok(false);
        };
        match persistence::load(path)? {
            Some(saved) => Ok(self.apply_preferences(saved)),
            None => Ok(false),
        }
    }
}

fn coordinator<E: Entity>(
    gateway: Arc<dyn EntityGateway<E>>,
    tenant: &Arc<dyn TenantSource>,
    sink: &Arc<dyn NotificationSink>,
) -> MutationCoordinator<E> {
    MutationCoordinator::new(
        EntityStore::new(),
        gateway,
        Arc::clone(tenant),
        Arc::clone(sink),
    )
}
