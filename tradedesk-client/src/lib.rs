//! Tradedesk REST client
//!
//! Loads [`ClientConfig`], builds the shared [`HttpTransport`] and exposes a
//! tenant-checked [`RestGateway`] per entity collection.

pub mod config;
pub mod error;
pub mod gateway;
pub mod transport;

pub use config::{AuthConfig, ClientConfig, ConfigError, CONFIG_ENV_VAR, DEFAULT_TENANT_HEADER};
pub use error::ClientError;
pub use gateway::RestGateway;
pub use transport::HttpTransport;
