//! Property-Based Tests for Optimistic Rollback
//!
//! **Property 1: Rollback Restores the Pre-Mutation State**
//!
//! For any collection, selection and failing status code, a failed update or
//! delete leaves items, order, detail entity, selection and total count
//! exactly as they were before the mutation started.
//!
//! **Property 2: Confirmed Deletes Decrement the Total Once**

use proptest::prelude::*;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tradedesk_core::{EntityGateway, TenantHandle, TenantId, Vendor, VendorPatch};
use tradedesk_store::{EntityStore, MutationCoordinator, NotificationLog, NotificationSink};
use tradedesk_test_utils::{generators, ErrorBody, MockGateway};

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn coordinator(
    tenant: TenantId,
    vendors: Vec<Vendor>,
) -> (MutationCoordinator<Vendor>, Arc<MockGateway<Vendor>>) {
    let handle = TenantHandle::new(Some(tenant));
    let gateway = Arc::new(MockGateway::new(Arc::new(handle.clone())).with_records(vendors.clone()));
    let store = EntityStore::new();
    store.set_items(vendors);

    let coordinator = MutationCoordinator::new(
        store,
        Arc::clone(&gateway) as Arc<dyn EntityGateway<Vendor>>,
        Arc::new(handle),
        Arc::new(NotificationLog::new()) as Arc<dyn NotificationSink>,
    );
    (coordinator, gateway)
}

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

#[derive(Debug, Clone)]
enum Mutation {
    Rename(String),
    Delete,
}

fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        "[A-Za-z ]{0,16}".prop_map(Mutation::Rename),
        Just(Mutation::Delete),
    ]
}

/// A page of vendors, a target index within it and a selection mask.
fn page_strategy() -> impl Strategy<Value = (TenantId, Vec<Vendor>, usize, Vec<bool>, bool)> {
    generators::arb_tenant_id().prop_flat_map(|tenant| {
        generators::arb_vendor_page(tenant, 12).prop_flat_map(move |vendors| {
            let len = vendors.len();
            (
                Just(tenant),
                Just(vendors),
                0..len,
                proptest::collection::vec(any::<bool>(), len),
                any::<bool>(),
            )
        })
    })
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property 1: Rollback Restores the Pre-Mutation State**
    #[test]
    fn prop_failed_mutation_restores_state(
        (tenant, vendors, target, mask, select_target) in page_strategy(),
        mutation in mutation_strategy(),
        status in generators::arb_error_status(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (coordinator, gateway) = coordinator(tenant, vendors.clone());
            let store = coordinator.store();
            for (vendor, selected) in vendors.iter().zip(&mask) {
                if *selected {
                    store.toggle_selection(&vendor.id);
                }
            }
            if select_target {
                store.set_selected(Some(vendors[target].clone()));
            }
            let before = store.snapshot();

            gateway.fail_next_status(status, ErrorBody::default());
            let id = vendors[target].id.clone();
            let result = match mutation {
                Mutation::Rename(name) => coordinator
                    .update(&id, VendorPatch::name(name))
                    .await
                    .map(|_| ()),
                Mutation::Delete => coordinator.delete(&id).await,
            };
            prop_assert!(result.is_err());

            let after = store.snapshot();
            prop_assert_eq!(&after.items, &before.items);
            prop_assert_eq!(&after.selected, &before.selected);
            prop_assert_eq!(&after.selected_ids, &before.selected_ids);
            prop_assert_eq!(after.pagination, before.pagination);
            prop_assert!(after.error.is_some());
            prop_assert!(after.loading.is_idle());
            prop_assert_eq!(gateway.records(), vendors);
            Ok(())
        })?;
    }

    /// **Property 2: Confirmed Deletes Decrement the Total Once**
    #[test]
    fn prop_confirmed_delete_decrements_total(
        (tenant, vendors, target, _mask, _select) in page_strategy(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (coordinator, _gateway) = coordinator(tenant, vendors.clone());
            let store = coordinator.store();
            let before = store.snapshot();

            let id = vendors[target].id.clone();
            coordinator
                .delete(&id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let after = store.snapshot();
            prop_assert_eq!(after.items.len(), before.items.len() - 1);
            prop_assert_eq!(after.pagination.total_count, before.pagination.total_count - 1);
            prop_assert!(!after.contains(&id));
            Ok(())
        })?;
    }
}
