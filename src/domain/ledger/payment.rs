//! Payment ledger records.
//!
//! The ledger is append-only: each provider payment intent or invoice is
//! recorded at most once, and rows are never updated after insert. The
//! idempotency key is the provider-side object id, enforced by unique
//! constraints in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::EmailAddress;

/// Whether a payment came from a one-off intent or a subscription invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    OneTime,
    Subscription,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::OneTime => "one_time",
            PaymentKind::Subscription => "subscription",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one_time" => Some(PaymentKind::OneTime),
            "subscription" => Some(PaymentKind::Subscription),
            _ => None,
        }
    }
}

/// Settlement status of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "canceled" => Some(PaymentStatus::Canceled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Provider-side object references attached to a payment.
///
/// At most the subset relevant to the payment kind is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRefs {
    pub payment_intent_id: Option<String>,
    pub invoice_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

/// A payment ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub email: EmailAddress,
    pub refs: ProviderRefs,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    /// Amount in integer minor currency units.
    pub amount_minor: i64,
    pub currency: String,
    /// Billing period bounds; subscription invoices only.
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

impl NewPayment {
    /// A one-time payment resolved from a payment intent event.
    pub fn one_time(
        email: EmailAddress,
        payment_intent_id: impl Into<String>,
        customer_id: Option<String>,
        status: PaymentStatus,
        amount_minor: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            email,
            refs: ProviderRefs {
                payment_intent_id: Some(payment_intent_id.into()),
                customer_id,
                ..ProviderRefs::default()
            },
            kind: PaymentKind::OneTime,
            status,
            amount_minor,
            currency: currency.into(),
            period_start: None,
            period_end: None,
        }
    }

    /// A subscription payment resolved from a paid invoice.
    #[allow(clippy::too_many_arguments)]
    pub fn subscription_invoice(
        email: EmailAddress,
        invoice_id: impl Into<String>,
        subscription_id: impl Into<String>,
        customer_id: Option<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            refs: ProviderRefs {
                invoice_id: Some(invoice_id.into()),
                subscription_id: Some(subscription_id.into()),
                customer_id,
                ..ProviderRefs::default()
            },
            kind: PaymentKind::Subscription,
            status: PaymentStatus::Succeeded,
            amount_minor,
            currency: currency.into(),
            period_start: Some(period_start),
            period_end: Some(period_end),
        }
    }

    /// The provider id that makes this insert idempotent.
    pub fn provider_key(&self) -> Option<&str> {
        self.refs
            .payment_intent_id
            .as_deref()
            .or(self.refs.invoice_id.as_deref())
    }
}

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub email: EmailAddress,
    pub refs: ProviderRefs,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub amount_minor: i64,
    pub currency: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
