//! Notification sink for mutation outcomes.
//!
//! Coordinators report each failure once with a short context label such as
//! "Update Vendor", and each confirmed mutation with a success message.

use chrono::Utc;
use std::sync::Mutex;
use tradedesk_core::{ErrorKind, Timestamp, TradeError};

pub const ERROR_DURATION_MS: u64 = 4_000;
pub const ERROR_WITH_DETAILS_DURATION_MS: u64 = 5_000;
pub const SUCCESS_DURATION_MS: u64 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    Dismiss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
    pub duration_ms: u64,
    pub action: Option<NotificationAction>,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
            duration_ms: SUCCESS_DURATION_MS,
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    /// `"{context}: {message}"`, with validation details as the description.
    pub fn from_error(error: &TradeError, context: &str) -> Self {
        let description = error.as_api().and_then(|api| api.field_description());
        let action = match error.kind() {
            Some(ErrorKind::Timeout | ErrorKind::NetworkError | ErrorKind::ServerError) => {
                Some(NotificationAction::Retry)
            }
            _ => None,
        };
        Self {
            level: NotificationLevel::Error,
            title: format!("{}: {}", context, error.user_message()),
            duration_ms: if description.is_some() {
                ERROR_WITH_DETAILS_DURATION_MS
            } else {
                ERROR_DURATION_MS
            },
            description,
            action,
            created_at: Utc::now(),
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Receives the outcome of every coordinated operation.
pub trait NotificationSink: Send + Sync {
    fn error(&self, error: &TradeError, context: &str);

    fn success(&self, message: &str);
}

/// Collects rendered notifications in memory, newest last.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        self.lock().push(notification);
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
            .cloned()
            .collect()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationSink for NotificationLog {
    fn error(&self, error: &TradeError, context: &str) {
        self.push(Notification::from_error(error, context));
    }

    fn success(&self, message: &str) {
        self.push(Notification::success(message));
    }
}

/// Writes notifications to the tracing subscriber instead of a UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn error(&self, error: &TradeError, context: &str) {
        let notification = Notification::from_error(error, context);
        tracing::warn!(
            kind = ?error.kind(),
            description = notification.description.as_deref().unwrap_or(""),
            "{}",
            notification.title
        );
    }

    fn success(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedesk_core::{
        classify, ErrorBody, FieldErrors, TenantContextError, TransportError, MSG_SERVER_ERROR,
        MSG_TENANT_CONTEXT,
    };

    fn api_error(status: u16, body: ErrorBody) -> TradeError {
        TradeError::Api(classify(TransportError::status(status, body)))
    }

    #[test]
    fn errors_are_prefixed_with_the_context() {
        let notification =
            Notification::from_error(&api_error(500, ErrorBody::default()), "Update Vendor");
        assert_eq!(notification.title, format!("Update Vendor: {}", MSG_SERVER_ERROR));
        assert_eq!(notification.description, None);
        assert_eq!(notification.duration_ms, ERROR_DURATION_MS);
        assert_eq!(notification.action, Some(NotificationAction::Retry));
    }

    #[test]
    fn validation_details_extend_the_duration() {
        let errors: FieldErrors = vec![
            ("name", vec!["required".to_string()]),
            ("email", vec!["bad format".to_string(), "exists".to_string()]),
        ]
        .into_iter()
        .collect();
        let body = ErrorBody {
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            code: None,
        };

        let notification = Notification::from_error(&api_error(422, body), "Create Vendor");
        assert_eq!(notification.title, "Create Vendor: Validation failed");
        assert_eq!(
            notification.description.as_deref(),
            Some("name: required\nemail: bad format, exists")
        );
        assert_eq!(notification.duration_ms, ERROR_WITH_DETAILS_DURATION_MS);
        assert_eq!(notification.action, None);
    }

    #[test]
    fn empty_validation_maps_have_no_description() {
        let body = ErrorBody {
            errors: Some(FieldErrors::new()),
            ..ErrorBody::default()
        };
        let notification = Notification::from_error(&api_error(422, body), "Update Product");
        assert_eq!(notification.description, None);
        assert_eq!(notification.duration_ms, ERROR_DURATION_MS);
    }

    #[test]
    fn tenant_errors_ask_for_a_refresh() {
        let err = TradeError::from(TenantContextError::Missing);
        let notification = Notification::from_error(&err, "Fetch Vendors");
        assert_eq!(notification.title, format!("Fetch Vendors: {}", MSG_TENANT_CONTEXT));
    }

    #[test]
    fn log_collects_and_drains() {
        let log = NotificationLog::new();
        log.success("Vendor updated successfully");
        log.error(&api_error(403, ErrorBody::default()), "Delete Vendor");

        assert_eq!(log.len(), 2);
        assert_eq!(log.errors().len(), 1);
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }
}
