//! Request and response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::handlers::FunnelStatus;
use crate::domain::ledger::{PaymentRecord, SubscriptionRecord};
use crate::domain::links::{LinkStatus, PaymentLink};

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct IssueLinkRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RenewLinkRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RedeemLinkRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePortalRequest {
    pub email: String,
    pub return_url: String,
}

/// Query string for the status endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub subscription_id: String,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub portal_url: String,
}

/// Funnel position for an identity.
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl From<FunnelStatus> for PaymentStatusResponse {
    fn from(status: FunnelStatus) -> Self {
        match status {
            FunnelStatus::Payment { status, kind } => Self {
                status: status.as_str().to_string(),
                kind: Some(kind.as_str().to_string()),
            },
            FunnelStatus::LinkNotFound => Self {
                status: "link_not_found".to_string(),
                kind: None,
            },
            FunnelStatus::AwaitingPayment => Self {
                status: "awaiting_payment".to_string(),
                kind: None,
            },
            FunnelStatus::AwaitingConfirmation => Self {
                status: "awaiting_confirmation".to_string(),
                kind: None,
            },
            FunnelStatus::LinkExpired => Self {
                status: "link_expired".to_string(),
                kind: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub active: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Admin views
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub email: String,
    pub kind: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentView {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.into_string(),
            kind: record.kind.as_str().to_string(),
            status: record.status.as_str().to_string(),
            amount: record.amount_minor,
            currency: record.currency,
            payment_intent_id: record.refs.payment_intent_id,
            invoice_id: record.refs.invoice_id,
            subscription_id: record.refs.subscription_id,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkView {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LinkView {
    /// Snapshot of a link's derived status at `now`.
    pub fn at(link: PaymentLink, now: DateTime<Utc>) -> Self {
        let status = match link.status(now) {
            LinkStatus::Active => "active",
            LinkStatus::Used => "used",
            LinkStatus::Expired => "expired",
            LinkStatus::Superseded => "superseded",
        };
        Self {
            id: link.id,
            email: link.email.into_string(),
            status: status.to_string(),
            expires_at: link.expires_at,
            created_at: link.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub subscription_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionRecord> for SubscriptionView {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.into_string(),
            subscription_id: record.provider_subscription_id,
            status: record.status,
            current_period_end: record.current_period_end,
            cancel_at_period_end: record.cancel_at_period_end,
            updated_at: record.updated_at,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// Structured error body: stable machine-readable code plus human message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
