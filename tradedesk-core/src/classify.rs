//! Error classification
//!
//! Maps every observed failure onto exactly one [`ErrorKind`]. Classification
//! is total and idempotent: an already classified exception passes through
//! untouched.

use crate::error::{
    ApiException, ErrorBody, ErrorKind, FieldErrors, TransportError, MSG_FORBIDDEN,
    MSG_NETWORK_ERROR, MSG_NOT_FOUND, MSG_SERVER_ERROR, MSG_TIMEOUT, MSG_UNAUTHORIZED,
    MSG_UNKNOWN, MSG_VALIDATION,
};

/// Fallback used by [`error_message`] when nothing better is known.
pub const DEFAULT_FALLBACK: &str = "An error occurred";

/// Anything a gateway call can fail with, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Raw HTTP/transport failure.
    Transport(TransportError),
    /// Already classified; classification is not re-applied.
    Classified(ApiException),
    /// A plain error with a message but no transport detail.
    Error(String),
    /// No usable information at all.
    Unknown,
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Transport(err)
    }
}

impl From<ApiException> for Failure {
    fn from(exception: ApiException) -> Self {
        Failure::Classified(exception)
    }
}

/// Classify a failure with the default unknown-error message.
pub fn classify(failure: impl Into<Failure>) -> ApiException {
    classify_with_fallback(failure, MSG_UNKNOWN)
}

/// Classify a failure; `fallback` is used only for [`Failure::Unknown`].
pub fn classify_with_fallback(failure: impl Into<Failure>, fallback: &str) -> ApiException {
    match failure.into() {
        Failure::Classified(exception) => exception,
        Failure::Transport(err) => classify_transport(err),
        Failure::Error(message) => ApiException::new(ErrorKind::Unknown, message),
        Failure::Unknown => ApiException::new(ErrorKind::Unknown, fallback),
    }
}

fn classify_transport(err: TransportError) -> ApiException {
    match err {
        TransportError::Status { status, body } => classify_status(status, body),
        TransportError::Timeout { .. } => ApiException::new(ErrorKind::Timeout, MSG_TIMEOUT)
            .with_status(0)
            .with_code(ErrorKind::Timeout.code()),
        TransportError::Network { .. } => {
            ApiException::new(ErrorKind::NetworkError, MSG_NETWORK_ERROR)
                .with_status(0)
                .with_code(ErrorKind::NetworkError.code())
        }
        TransportError::Decode { message } => ApiException::new(ErrorKind::Unknown, message),
    }
}

fn classify_status(status: u16, body: ErrorBody) -> ApiException {
    let ErrorBody {
        message,
        errors,
        code,
    } = body;

    let kind = match status {
        422 => ErrorKind::Validation,
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Unknown,
    };

    let message = match kind {
        ErrorKind::Validation => message.unwrap_or_else(|| MSG_VALIDATION.to_string()),
        ErrorKind::Unauthorized => MSG_UNAUTHORIZED.to_string(),
        ErrorKind::Forbidden => MSG_FORBIDDEN.to_string(),
        ErrorKind::NotFound => message.unwrap_or_else(|| MSG_NOT_FOUND.to_string()),
        ErrorKind::ServerError => MSG_SERVER_ERROR.to_string(),
        _ => message.unwrap_or_else(|| format!("Request failed with status code {}", status)),
    };

    let mut exception = ApiException::new(kind, message).with_status(status);
    if kind == ErrorKind::Validation {
        exception.errors = Some(errors.unwrap_or_default());
    }
    exception.code = match kind {
        ErrorKind::Unknown => code,
        _ => Some(code.unwrap_or_else(|| kind.code().to_string())),
    };
    exception
}

/// Best human-readable message for a failure without classifying it.
pub fn error_message(failure: &Failure, fallback: Option<&str>) -> String {
    match failure {
        Failure::Classified(exception) => exception.message.clone(),
        Failure::Transport(TransportError::Status { body, .. }) if body.message.is_some() => {
            body.message.clone().unwrap_or_default()
        }
        Failure::Transport(err) => err.to_string(),
        Failure::Error(message) => message.clone(),
        Failure::Unknown => fallback.unwrap_or(DEFAULT_FALLBACK).to_string(),
    }
}

/// Field errors carried by a failure, if any.
pub fn validation_errors(failure: &Failure) -> Option<&FieldErrors> {
    match failure {
        Failure::Classified(exception) => exception.errors.as_ref(),
        Failure::Transport(TransportError::Status { body, .. }) => body.errors.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, message: Option<&str>) -> TransportError {
        TransportError::status(
            status,
            ErrorBody {
                message: message.map(str::to_string),
                ..ErrorBody::default()
            },
        )
    }

    #[test]
    fn server_errors_use_the_canonical_message() {
        let exception = classify(status_error(500, Some("Internal server error")));
        assert_eq!(exception.kind, ErrorKind::ServerError);
        assert_eq!(exception.message, MSG_SERVER_ERROR);
        assert_eq!(exception.status, Some(500));
        assert_eq!(exception.code.as_deref(), Some("SERVER_ERROR"));

        let unavailable = classify(status_error(503, None));
        assert_eq!(unavailable.kind, ErrorKind::ServerError);
        assert_eq!(unavailable.status, Some(503));
    }

    #[test]
    fn auth_errors_ignore_the_server_message() {
        assert_eq!(
            classify(status_error(401, Some("Unauthorized"))).message,
            MSG_UNAUTHORIZED
        );
        assert_eq!(
            classify(status_error(403, Some("Forbidden"))).message,
            MSG_FORBIDDEN
        );
    }

    #[test]
    fn not_found_prefers_the_server_message() {
        let exception = classify(status_error(404, Some("Vendor not found")));
        assert_eq!(exception.kind, ErrorKind::NotFound);
        assert_eq!(exception.message, "Vendor not found");
        assert_eq!(exception.code.as_deref(), Some("NOT_FOUND"));

        assert_eq!(classify(status_error(404, None)).message, MSG_NOT_FOUND);
    }

    #[test]
    fn validation_errors_keep_the_field_map_verbatim() {
        let errors: FieldErrors = vec![
            ("name", vec!["required".to_string()]),
            ("email", vec!["bad format".to_string(), "exists".to_string()]),
        ]
        .into_iter()
        .collect();
        let body = ErrorBody {
            message: Some("The given data was invalid".to_string()),
            errors: Some(errors.clone()),
            code: Some("VALIDATION_ERROR".to_string()),
        };

        let exception = classify(TransportError::status(422, body));
        assert_eq!(exception.kind, ErrorKind::Validation);
        assert_eq!(exception.message, "The given data was invalid");
        assert_eq!(exception.errors, Some(errors));
        assert_eq!(
            exception.field_description().as_deref(),
            Some("name: required\nemail: bad format, exists")
        );
    }

    #[test]
    fn validation_without_errors_still_classifies() {
        let exception = classify(status_error(422, None));
        assert_eq!(exception.kind, ErrorKind::Validation);
        assert_eq!(exception.message, MSG_VALIDATION);
        assert_eq!(exception.errors, Some(FieldErrors::new()));
        assert_eq!(exception.field_description(), None);
    }

    #[test]
    fn transport_failures_report_status_zero() {
        let timeout = classify(TransportError::Timeout {
            message: "timeout of 5000ms exceeded".to_string(),
        });
        assert_eq!(timeout.kind, ErrorKind::Timeout);
        assert_eq!(timeout.message, MSG_TIMEOUT);
        assert_eq!(timeout.status, Some(0));

        let network = classify(TransportError::Network {
            message: "connection refused".to_string(),
        });
        assert_eq!(network.kind, ErrorKind::NetworkError);
        assert_eq!(network.message, MSG_NETWORK_ERROR);
        assert_eq!(network.status, Some(0));
    }

    #[test]
    fn other_statuses_fall_back_to_unknown() {
        let exception = classify(status_error(400, Some("Bad request")));
        assert_eq!(exception.kind, ErrorKind::Unknown);
        assert_eq!(exception.message, "Bad request");
        assert_eq!(exception.status, Some(400));

        let bare = classify(status_error(409, None));
        assert_eq!(bare.message, "Request failed with status code 409");
    }

    #[test]
    fn plain_errors_and_unknown_values() {
        let exception = classify(Failure::Error("Something went wrong".to_string()));
        assert_eq!(exception.kind, ErrorKind::Unknown);
        assert_eq!(exception.message, "Something went wrong");
        assert_eq!(exception.status, None);

        assert_eq!(classify(Failure::Unknown).message, MSG_UNKNOWN);
        assert_eq!(
            classify_with_fallback(Failure::Unknown, "Failed to fetch invoices").message,
            "Failed to fetch invoices"
        );
    }

    #[test]
    fn classified_exceptions_pass_through() {
        let original = ApiException::new(ErrorKind::ServerError, "Original error").with_status(500);
        assert_eq!(classify(original.clone()), original);
    }

    #[test]
    fn message_helpers() {
        assert_eq!(
            error_message(&status_error(400, Some("Bad request message")).into(), None),
            "Bad request message"
        );
        assert_eq!(
            error_message(
                &TransportError::Network {
                    message: "Network error occurred".to_string()
                }
                .into(),
                None
            ),
            "Network error occurred"
        );
        assert_eq!(error_message(&Failure::Unknown, None), DEFAULT_FALLBACK);
        assert_eq!(
            error_message(&Failure::Unknown, Some("Custom fallback")),
            "Custom fallback"
        );
        assert!(validation_errors(&Failure::Error("Generic".to_string())).is_none());
    }
}
