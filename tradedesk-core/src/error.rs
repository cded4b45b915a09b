//! Error types for tradedesk operations
//!
//! Transport failures are captured as a tagged [`TransportError`] at the HTTP
//! boundary and classified exactly once into an [`ApiException`] carrying one
//! of the closed [`ErrorKind`]s. Everything above the gateway only forwards.

use crate::{EntityKind, TenantId};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

// ============================================================================
// CANONICAL MESSAGES
// ============================================================================

pub const MSG_VALIDATION: &str = "Validation failed";
pub const MSG_UNAUTHORIZED: &str = "Session expired. Please login again.";
pub const MSG_FORBIDDEN: &str = "You don't have permission to perform this action.";
pub const MSG_NOT_FOUND: &str = "Resource not found";
pub const MSG_SERVER_ERROR: &str = "Server error. Please try again later.";
pub const MSG_TIMEOUT: &str = "Request timeout. Please check your connection.";
pub const MSG_NETWORK_ERROR: &str = "Network error. Please check your internet connection.";
pub const MSG_UNKNOWN: &str = "An unknown error occurred";
pub const MSG_TENANT_CONTEXT: &str = "Tenant context not available. Please refresh the page.";

// ============================================================================
// ERROR KIND
// ============================================================================

/// Closed taxonomy of user-facing failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// HTTP 422 with a field-error map
    Validation,
    /// HTTP 401
    Unauthorized,
    /// HTTP 403
    Forbidden,
    /// HTTP 404
    NotFound,
    /// HTTP 5xx
    ServerError,
    /// Transport timeout
    Timeout,
    /// Transport could not reach the server
    NetworkError,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// FIELD ERRORS
// ============================================================================

/// Field → messages map from a validation response, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the messages for a field, replacing any previous entry in place.
    pub fn insert(&mut self, field: impl Into<String>, messages: Vec<String>) {
        let field = field.into();
        if let Some(entry) = self.0.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = messages;
        } else {
            self.0.push((field, messages));
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// One `field: m1, m2` line per field, joined by newlines.
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        let mut errors = FieldErrors::new();
        for (field, messages) in iter {
            errors.insert(field, messages);
        }
        errors
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Some endpoints send a bare string instead of a one-element list.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Messages {
            Many(Vec<String>),
            One(String),
        }

        struct FieldErrorsVisitor;

        impl<'de> Visitor<'de> for FieldErrorsVisitor {
            type Value = FieldErrors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to error messages")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut errors = FieldErrors::new();
                while let Some((field, messages)) = access.next_entry::<String, Messages>()? {
                    let messages = match messages {
                        Messages::Many(list) => list,
                        Messages::One(single) => vec![single],
                    };
                    errors.insert(field, messages);
                }
                Ok(errors)
            }
        }

        deserializer.deserialize_map(FieldErrorsVisitor)
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Error payload of a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Raw failure as observed at the HTTP client boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: ErrorBody },

    #[error("{message}")]
    Timeout { message: String },

    #[error("{message}")]
    Network { message: String },

    #[error("Invalid response payload: {message}")]
    Decode { message: String },
}

impl TransportError {
    pub fn status(status: u16, body: ErrorBody) -> Self {
        TransportError::Status { status, body }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// CLASSIFIED ERRORS
// ============================================================================

/// A classified failure: one kind, one display message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiException {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status; `Some(0)` for transport failures, `None` when no request
    /// was involved.
    pub status: Option<u16>,
    pub errors: Option<FieldErrors>,
    pub code: Option<String>,
}

impl ApiException {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            errors: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Field-level description for display; `None` when there is nothing to list.
    pub fn field_description(&self) -> Option<String> {
        self.errors
            .as_ref()
            .filter(|errors| !errors.is_empty())
            .map(FieldErrors::describe)
    }
}

/// The caller did not establish, or tried to cross, a tenant boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TenantContextError {
    #[error("Tenant context not available")]
    Missing,

    #[error("Tenant mismatch: expected {expected}, found {found}")]
    Mismatch { expected: TenantId, found: TenantId },
}

/// A status transition rejected before reaching the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {action} {kind} while it is {from}")]
    NotAllowed {
        kind: EntityKind,
        action: &'static str,
        from: String,
    },

    #[error("Invalid {action} argument: {reason}")]
    InvalidArgument { action: &'static str, reason: String },
}

/// Master error type for gateway and coordinator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error(transparent)]
    TenantContext(#[from] TenantContextError),

    #[error(transparent)]
    Api(#[from] ApiException),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl TradeError {
    /// Message suitable for the `error` slot of a collection or a toast.
    pub fn user_message(&self) -> String {
        match self {
            TradeError::TenantContext(_) => MSG_TENANT_CONTEXT.to_string(),
            TradeError::Api(exception) => exception.message.clone(),
            TradeError::Transition(err) => err.to_string(),
        }
    }

    pub fn as_api(&self) -> Option<&ApiException> {
        match self {
            TradeError::Api(exception) => Some(exception),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.as_api().map(|exception| exception.kind)
    }
}

/// Result type for tradedesk operations.
pub type TradeResult<T> = Result<T, TradeError>;
