//! Webhook error types.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics. The provider
//! retries on 5xx, so only failures that left state unreconciled may map
//! there.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A Checkout Bridge call failed while reconciling the event.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A store write failed; the event was not reconciled.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    ///
    /// Retryable errors are exactly those where local state was left
    /// unreconciled for reasons a later delivery can fix.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Persistence(_) | WebhookError::Upstream(_)
        )
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// Status codes determine the provider's retry behavior:
    /// - 2xx: event acknowledged, no retry
    /// - 4xx: rejected, no retry
    /// - 5xx: will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - reject before any mutation
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Malformed input - no retry will fix it
            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // The event was not applied; a retry can succeed
            WebhookError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WebhookError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Persistence(err.to_string())
    }
}
