//! Tradedesk Test Utilities
//!
//! Shared test infrastructure for the tradedesk workspace:
//! - An in-memory, scriptable gateway for coordinator tests
//! - Entity fixtures
//! - Proptest generators
//! - Tracing setup for tests

pub use tradedesk_core::{
    classify, ApiException, Entity, EntityAction, EntityGateway, EntityId, ErrorBody, ErrorKind,
    FieldErrors, Invoice, InvoiceStatus, ListQuery, Page, PaginationMeta, Product, ProductStatus,
    ProductionItem, ProductionStatus, Quote, QuoteStatus, TenantContextError, TenantHandle,
    TenantId, TenantSource, TradeError, TradeResult, TransportError, Vendor, VendorStatus,
};

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tradedesk_core::require_tenant;

// ============================================================================
// MOCK GATEWAY
// ============================================================================

/// Creates the server-side record for a draft.
pub type CreateFn<E> = Box<dyn Fn(&<E as Entity>::Draft, TenantId, EntityId) -> E + Send + Sync>;

struct MockState<E: Entity> {
    records: Vec<E>,
    failures: VecDeque<TradeError>,
    calls: BTreeMap<&'static str, usize>,
    next_id: u64,
}

/// In-memory [`EntityGateway`] with scripted failures.
///
/// Calls resolve the tenant first and fail without being counted when none
/// is set, like the REST gateway that never issues the request. Queued
/// failures are returned in order, one per counted call. While the gate is
/// held every counted call parks until [`MockGateway::release`].
pub struct MockGateway<E: Entity> {
    tenant: Arc<dyn TenantSource>,
    state: Arc<Mutex<MockState<E>>>,
    create: Option<CreateFn<E>>,
    gate: watch::Sender<bool>,
    arrivals: watch::Sender<usize>,
}

impl<E: Entity> MockGateway<E> {
    pub fn new(tenant: Arc<dyn TenantSource>) -> Self {
        Self {
            tenant,
            state: Arc::new(Mutex::new(MockState {
                records: Vec::new(),
                failures: VecDeque::new(),
                calls: BTreeMap::new(),
                next_id: 1000,
            })),
            create: None,
            gate: watch::Sender::new(false),
            arrivals: watch::Sender::new(0),
        }
    }

    pub fn with_records(self, records: Vec<E>) -> Self {
        self.lock().records = records;
        self
    }

    /// Enable `create`; ids are assigned from 1000 upwards.
    pub fn with_create(
        mut self,
        create: impl Fn(&E::Draft, TenantId, EntityId) -> E + Send + Sync + 'static,
    ) -> Self {
        self.create = Some(Box::new(create));
        self
    }

    /// Server-side copy of the collection.
    pub fn records(&self) -> Vec<E> {
        self.lock().records.clone()
    }

    pub fn set_records(&self, records: Vec<E>) {
        self.lock().records = records;
    }

    /// Queue a failure for the next counted call.
    pub fn fail_next(&self, err: impl Into<TradeError>) {
        self.lock().failures.push_back(err.into());
    }

    /// Queue an HTTP status failure, classified the way the REST gateway does.
    pub fn fail_next_status(&self, status: u16, body: ErrorBody) {
        self.fail_next(classify(TransportError::status(status, body)));
    }

    /// Number of counted calls to `method` ("list", "get", "create", ...).
    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Park every subsequent call until [`MockGateway::release`].
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    pub fn release(&self) {
        self.gate.send_replace(false);
    }

    /// Wait until `count` calls in total have reached the gate.
    pub async fn wait_for_arrivals(&self, count: usize) {
        let mut arrivals = self.arrivals.subscribe();
        let _ = arrivals.wait_for(|arrived| *arrived >= count).await;
    }

    fn lock(&self) -> MutexGuard<'_, MockState<E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Tenant check, call accounting, gate and scripted failure, in that order.
    async fn enter(&self, method: &'static str) -> TradeResult<TenantId> {
        let tenant = require_tenant(self.tenant.as_ref())?;
        *self.lock().calls.entry(method).or_insert(0) += 1;
        self.arrivals.send_modify(|arrived| *arrived += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|held| !*held).await;

        match self.lock().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(tenant),
        }
    }
}

fn not_found() -> TradeError {
    classify(TransportError::status(404, ErrorBody::default())).into()
}

#[async_trait]
impl<E: Entity> EntityGateway<E> for MockGateway<E> {
    async fn list(&self, query: &ListQuery) -> TradeResult<Page<E>> {
        self.enter("list").await?;
        let records = self.records();
        let per_page = query.per_page.max(1);
        let total_count = records.len() as u64;
        let total_pages = (records.len() as u32).div_ceil(per_page).max(1);
        let start = ((query.page.max(1) - 1) * per_page) as usize;
        let data = records
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        Ok(Page {
            data,
            pagination: PaginationMeta {
                current_page: query.page.max(1),
                total_pages,
                total_count,
                per_page,
            },
        })
    }

    async fn get(&self, id: &EntityId) -> TradeResult<E> {
        self.enter("get").await?;
        self.lock()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create(&self, draft: &E::Draft) -> TradeResult<E> {
        let tenant = self.enter("create").await?;
        let Some(create) = &self.create else {
            return Err(TradeError::from(ApiException::new(
                ErrorKind::ServerError,
                "create is not scripted on this mock",
            )));
        };

        let mut state = self.lock();
        let id = EntityId::from(state.next_id.to_string());
        state.next_id += 1;
        let entity = create(draft, tenant, id);
        state.records.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> TradeResult<E> {
        self.enter("update").await?;
        let mut state = self.lock();
        let record = state
            .records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(not_found)?;
        record.apply_patch(patch);
        Ok(record.clone())
    }

    async fn delete(&self, id: &EntityId) -> TradeResult<()> {
        self.enter("delete").await?;
        let mut state = self.lock();
        let index = state
            .records
            .iter()
            .position(|record| record.id() == id)
            .ok_or_else(not_found)?;
        state.records.remove(index);
        Ok(())
    }

    async fn bulk_update(&self, ids: &[EntityId], patch: &E::Patch) -> TradeResult<Vec<E>> {
        self.enter("bulk_update").await?;
        let mut state = self.lock();
        let mut updated = Vec::new();
        for record in state.records.iter_mut().filter(|r| ids.contains(r.id())) {
            record.apply_patch(patch);
            updated.push(record.clone());
        }
        Ok(updated)
    }

    async fn perform(&self, id: &EntityId, action: &E::Action) -> TradeResult<E> {
        self.enter(action.segment()).await?;
        let mut state = self.lock();
        let record = state
            .records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(not_found)?;
        *record = action.apply_optimistic(record)?;
        Ok(record.clone())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities for common scenarios.

    use super::*;

    pub fn vendor(id: &str, tenant: TenantId) -> Vendor {
        Vendor {
            id: EntityId::from(id),
            tenant_id: tenant,
            name: "Test Vendor".to_string(),
            email: format!("vendor{}@example.com", id),
            phone: None,
            address: None,
            status: VendorStatus::Active,
            rating: Some(4.5),
            total_orders: 12,
            company_size: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// `count` vendors with ids "1".."count".
    pub fn vendors(count: usize, tenant: TenantId) -> Vec<Vendor> {
        (1..=count).map(|i| vendor(&i.to_string(), tenant)).collect()
    }

    pub fn product(id: &str, tenant: TenantId) -> Product {
        Product {
            id: EntityId::from(id),
            tenant_id: tenant,
            name: "Etched brass plate".to_string(),
            sku: format!("SKU-{}", id),
            price: 150_000,
            currency: "IDR".to_string(),
            stock_quantity: 20,
            status: ProductStatus::Published,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn invoice(id: &str, tenant: TenantId, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: EntityId::from(id),
            tenant_id: tenant,
            invoice_number: format!("INV-{}", id),
            customer_name: "PT Maju Jaya".to_string(),
            status,
            total_amount: 2_500_000,
            due_date: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn quote(id: &str, tenant: TenantId, status: QuoteStatus) -> Quote {
        Quote {
            id: EntityId::from(id),
            tenant_id: tenant,
            quote_number: format!("QT-{}", id),
            customer_name: "PT Maju Jaya".to_string(),
            vendor_id: Some(EntityId::from("1")),
            status,
            grand_total: 1_000_000,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn production_item(id: &str, tenant: TenantId, status: ProductionStatus) -> ProductionItem {
        ProductionItem {
            id: EntityId::from(id),
            tenant_id: tenant,
            product_name: "Etched plaque".to_string(),
            quantity: 50,
            status,
            progress_percentage: 0,
            current_stage: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// A 422 body with field errors in the given order.
    pub fn validation_body(fields: &[(&str, &str)]) -> ErrorBody {
        let mut errors = FieldErrors::new();
        for (field, message) in fields {
            errors.insert(*field, vec![message.to_string()]);
        }
        ErrorBody {
            message: Some("The given data was invalid.".to_string()),
            errors: Some(errors),
            code: None,
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for tradedesk types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        any::<u128>().prop_map(|bits| TenantId::new(Uuid::from_u128(bits)))
    }

    pub fn arb_vendor_status() -> impl Strategy<Value = VendorStatus> {
        prop_oneof![
            Just(VendorStatus::Active),
            Just(VendorStatus::Inactive),
            Just(VendorStatus::Suspended),
        ]
    }

    pub fn arb_vendor(tenant: TenantId) -> impl Strategy<Value = Vendor> {
        (1u32..10_000, "[A-Za-z ]{1,24}", arb_vendor_status(), 0u32..500).prop_map(
            move |(id, name, status, total_orders)| Vendor {
                name,
                status,
                total_orders,
                ..fixtures::vendor(&id.to_string(), tenant)
            },
        )
    }

    /// Vendors with distinct ids, in generated order.
    pub fn arb_vendor_page(tenant: TenantId, max: usize) -> impl Strategy<Value = Vec<Vendor>> {
        proptest::collection::btree_set(1u32..10_000, 1..=max).prop_flat_map(move |ids| {
            let ids: Vec<u32> = ids.into_iter().collect();
            Just(ids).prop_shuffle().prop_map(move |ids| {
                ids.iter()
                    .map(|id| fixtures::vendor(&id.to_string(), tenant))
                    .collect()
            })
        })
    }

    /// Status codes the gateway can fail with, including unmapped ones.
    pub fn arb_error_status() -> impl Strategy<Value = u16> {
        prop_oneof![
            Just(401u16),
            Just(403),
            Just(404),
            Just(409),
            Just(422),
            Just(429),
            500u16..600,
        ]
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly subscriber honoring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gateway(tenant: Option<TenantId>) -> MockGateway<Vendor> {
        let tenant = tenant.unwrap_or_else(TenantId::new_v4);
        MockGateway::new(Arc::new(TenantHandle::new(Some(tenant))))
            .with_records(fixtures::vendors(3, tenant))
    }

    #[tokio::test]
    async fn missing_tenant_is_not_counted() {
        let gateway: MockGateway<Vendor> = MockGateway::new(Arc::new(TenantHandle::default()));
        let err = gateway.get(&EntityId::from("1")).await.unwrap_err();
        assert_eq!(err, TradeError::TenantContext(TenantContextError::Missing));
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let gateway = gateway(None);
        gateway.fail_next_status(500, ErrorBody::default());

        let err = gateway.delete(&EntityId::from("1")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ServerError));
        assert_eq!(gateway.records().len(), 3);

        gateway.delete(&EntityId::from("1")).await.unwrap();
        assert_eq!(gateway.records().len(), 2);
        assert_eq!(gateway.calls("delete"), 2);
    }

    #[tokio::test]
    async fn held_calls_wait_for_release() {
        let gateway = Arc::new(gateway(None));
        gateway.hold();

        let pending = tokio::spawn({
            let gateway = Arc::clone(&gateway);
            async move { gateway.get(&EntityId::from("2")).await }
        });
        gateway.wait_for_arrivals(1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        gateway.release();
        let vendor = pending.await.unwrap().unwrap();
        assert_eq!(vendor.id, EntityId::from("2"));
    }

    #[tokio::test]
    async fn list_paginates_records() {
        let gateway = gateway(None);
        let query = ListQuery {
            page: 2,
            per_page: 2,
            ..ListQuery::default()
        };
        let page = gateway.list(&query).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.pagination.total_count, 3);
        assert_eq!(page.pagination.total_pages, 2);
    }
}
