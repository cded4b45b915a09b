//! Tradedesk collection stores
//!
//! Observable per-type entity collections, the optimistic mutation
//! coordinator that keeps them in step with the server, and the notification
//! sink that reports each outcome.

pub mod collection;
pub mod command;
pub mod context;
pub mod coordinator;
pub mod inflight;
pub mod notifications;
pub mod persistence;
pub mod store;

pub use collection::{CollectionState, LoadingCategory, LoadingFlags};
pub use command::{MutationCommand, MutationSnapshot};
pub use context::{AppContext, Gateways};
pub use coordinator::MutationCoordinator;
pub use inflight::{InflightGuard, InflightLocks};
pub use notifications::{
    Notification, NotificationAction, NotificationLevel, NotificationLog, NotificationSink,
    TracingSink,
};
pub use persistence::{PersistedCollection, PersistedState, PersistenceError};
pub use store::{EntityStore, LoadingGuard, PendingMutation};
