//! Checkout Bridge port - the opaque external payment processor.
//!
//! The core never talks to the processor's API directly; it calls this port
//! and consumes the responses. Implementations must bound every request with
//! a timeout and surface failures instead of hanging. Retry policy belongs
//! to callers, not the bridge.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};

/// Checkout session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
    /// Recurring subscription.
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// A created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent id (pi_xxx).
    pub id: String,

    /// Secret the frontend uses to confirm the payment.
    pub client_secret: String,

    /// Amount in integer minor currency units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionRequest {
    pub mode: CheckoutMode,
    pub customer_email: EmailAddress,
    /// Provider price id for the line item.
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id (cs_xxx).
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,
}

/// Subscription details as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSubscription {
    /// Provider's subscription id (sub_xxx).
    pub id: String,

    /// Provider's customer id (cus_xxx).
    pub customer: String,

    /// Provider status string (active, past_due, canceled, ...).
    pub status: String,

    /// Current billing period start (Unix timestamp).
    pub current_period_start: i64,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: i64,

    /// Whether the subscription cancels at period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// A created billing portal session.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to manage their subscription.
    pub url: String,
}

/// Errors from Checkout Bridge operations.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The request never completed (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider rejected the request.
    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider's response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The referenced provider object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<BridgeError> for DomainError {
    fn from(err: BridgeError) -> Self {
        DomainError::new(ErrorCode::UpstreamError, err.to_string())
    }
}

/// Port for the external payment processor.
#[async_trait]
pub trait CheckoutBridge: Send + Sync {
    /// Creates a payment intent for a one-time payment.
    ///
    /// Metadata keys survive into webhook payloads and carry the identity
    /// correlation (the `email` key).
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, BridgeError>;

    /// Creates a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, BridgeError>;

    /// Fetches current subscription details by provider id.
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<BridgeSubscription, BridgeError>;

    /// Updates a subscription's cancel-at-period-end flag.
    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<BridgeSubscription, BridgeError>;

    /// Creates a billing portal session for subscription self-service.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BridgeError>;
}
