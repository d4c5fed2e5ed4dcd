//! Ledger ports - the only mutation surface for payments and subscriptions.
//!
//! `LedgerWriter` is invoked exclusively by the webhook event dispatcher; all
//! state transitions funnel through that single authenticated entry point.
//! Every write is safe to retry for the same provider id: conflicts on the
//! provider-id unique keys resolve to a no-op or field refresh, never a
//! duplicate row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::ledger::{NewPayment, PaymentRecord, SubscriptionRecord, SubscriptionState};

/// Outcome of an idempotent ledger insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First time this provider id was seen; a row was appended.
    Recorded,
    /// The provider id already has a row; nothing changed.
    AlreadyRecorded,
}

/// Outcome of a subscription mutation keyed by provider subscription id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionUpdateOutcome {
    /// The row changed; `updated_at` advanced.
    Applied,
    /// The row already held these values; `updated_at` untouched.
    Unchanged,
    /// No row exists for this provider subscription id.
    NotFound,
}

/// Field changes carried by a subscription-updated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPatch {
    pub provider_subscription_id: String,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Port for appending payments and reconciling subscription state.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Appends a payment row, idempotent on the provider payment-intent or
    /// invoice id. A conflicting insert is success, not an error.
    async fn record_payment(&self, payment: NewPayment) -> Result<RecordOutcome, DomainError>;

    /// Inserts or refreshes the subscription row for a provider
    /// subscription id. `updated_at` advances only on real field changes.
    async fn upsert_subscription(&self, state: SubscriptionState) -> Result<(), DomainError>;

    /// Applies status/period/cancel-flag changes to an existing row.
    ///
    /// A missing row is reported, not created: initial state is established
    /// by checkout completion, which carries the identity this event lacks.
    async fn apply_subscription_update(
        &self,
        patch: SubscriptionPatch,
    ) -> Result<SubscriptionUpdateOutcome, DomainError>;

    /// Marks a subscription canceled. The row is never deleted; cancellation
    /// history stays queryable.
    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionUpdateOutcome, DomainError>;
}

/// Port for reading reconciled payment and subscription state.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// The most recent payment row for an identity, if any.
    async fn latest_payment(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// The subscription row for an identity, if any (most recently updated
    /// wins if several exist).
    async fn subscription_for_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// True iff the identity holds a subscription with status `active` and
    /// a period end after `now`.
    async fn has_active_subscription(
        &self,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Lists all payment rows (admin view).
    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DomainError>;

    /// Lists all subscription rows (admin view).
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, DomainError>;
}
