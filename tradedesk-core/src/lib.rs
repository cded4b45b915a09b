//! Tradedesk Core Data Structures
//!
//! Tenant-scoped entity types, the classified error taxonomy and the gateway
//! contract shared by the HTTP client and the optimistic collection stores.

pub mod classify;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod invoice;
pub mod product;
pub mod production;
pub mod query;
pub mod quote;
pub mod tenant;
pub mod vendor;

pub use classify::{
    classify, classify_with_fallback, error_message, validation_errors, Failure, DEFAULT_FALLBACK,
};
pub use entity::{Entity, EntityAction, EntityKind, NoAction};
pub use envelope::{decode_entities, decode_entity, unwrap_data_envelope};
pub use error::{
    ApiException, ErrorBody, ErrorKind, FieldErrors, TenantContextError, TradeError, TradeResult,
    TransitionError, TransportError, MSG_FORBIDDEN, MSG_NETWORK_ERROR, MSG_NOT_FOUND,
    MSG_SERVER_ERROR, MSG_TENANT_CONTEXT, MSG_TIMEOUT, MSG_UNAUTHORIZED, MSG_UNKNOWN,
    MSG_VALIDATION,
};
pub use gateway::EntityGateway;
pub use identity::{EntityId, TenantId, Timestamp};
pub use invoice::{Invoice, InvoiceAction, InvoicePatch, InvoiceStatus, NewInvoice};
pub use product::{NewProduct, Product, ProductPatch, ProductStatus};
pub use production::{
    NewProductionItem, ProductionAction, ProductionItem, ProductionItemPatch, ProductionStatus,
};
pub use query::{FilterPatch, ListQuery, Page, PaginationMeta, SortOrder};
pub use quote::{NewQuote, Quote, QuoteAction, QuotePatch, QuoteStatus};
pub use tenant::{ensure_same_tenant, require_tenant, TenantHandle, TenantSource};
pub use vendor::{CompanySize, NewVendor, Vendor, VendorPatch, VendorStatus};
