//! Provider webhook event types.
//!
//! Defines the structures for parsing provider webhook payloads and the
//! closed classification enum the dispatcher routes on. Only fields relevant
//! to reconciliation are captured; everything else in the provider's event
//! schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A provider webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Raw event type string (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: ProviderEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

impl ProviderEvent {
    /// Classifies the raw event type into a known kind.
    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Recognized event kinds, plus an explicit catch-all.
///
/// New provider event types land in `Unrecognized` and are acknowledged
/// without processing, so forward compatibility never breaks delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// One-time payment intent settled.
    PaymentSucceeded,
    /// One-time payment intent failed.
    PaymentFailed,
    /// Checkout session completed.
    CheckoutCompleted,
    /// Subscription invoice paid.
    InvoicePaid,
    /// Subscription created at the provider.
    SubscriptionCreated,
    /// Subscription state changed at the provider.
    SubscriptionUpdated,
    /// Subscription deleted at the provider.
    SubscriptionDeleted,
    /// Anything else.
    Unrecognized,
}

impl EventKind {
    /// Parse an event kind from the provider's type string.
    pub fn from_type(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => Self::PaymentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentFailed,
            "checkout.session.completed" => Self::CheckoutCompleted,
            "invoice.paid" => Self::InvoicePaid,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            _ => Self::Unrecognized,
        }
    }

    /// The provider's type string for this kind.
    pub fn as_type(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded => "payment_intent.succeeded",
            Self::PaymentFailed => "payment_intent.payment_failed",
            Self::CheckoutCompleted => "checkout.session.completed",
            Self::InvoicePaid => "invoice.paid",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::Unrecognized => "unrecognized",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire objects (the relevant slice of `data.object` per event kind)
// ════════════════════════════════════════════════════════════════════════════

/// Payment intent object carried by payment_intent.* events.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentObject {
    /// Resolves the identity this payment belongs to.
    ///
    /// The receipt email wins; the `email` metadata key set at intent
    /// creation is the fallback.
    pub fn resolved_email(&self) -> Option<&str> {
        self.receipt_email
            .as_deref()
            .or_else(|| self.metadata.get("email").map(String::as_str))
    }
}

/// Checkout session object carried by checkout.session.completed.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub mode: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Customer details nested in a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSessionObject {
    /// True for subscription-mode sessions.
    pub fn is_subscription_mode(&self) -> bool {
        self.mode == "subscription"
    }

    /// Resolves the customer's email from the session.
    pub fn resolved_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }
}

/// Invoice object carried by invoice.paid.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    pub amount_paid: i64,
    pub currency: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub lines: InvoiceLines,
}

/// Invoice line container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

/// A single invoice line with its billing period.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLine {
    pub period: InvoicePeriod,
}

/// Billing period bounds (Unix timestamps).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InvoicePeriod {
    pub start: i64,
    pub end: i64,
}

impl InvoiceObject {
    /// Billing period of the first line, the provider's convention for the
    /// invoice's own period.
    pub fn period(&self) -> Option<InvoicePeriod> {
        self.lines.data.first().map(|line| line.period)
    }
}

/// Subscription object carried by customer.subscription.* events.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}
