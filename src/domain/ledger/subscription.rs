//! Subscription current-state records.
//!
//! Unlike the payment ledger, subscription state is mutable: exactly one row
//! exists per provider subscription id, upserted from each relevant webhook.
//! The status string is the provider's own vocabulary; the only value the
//! access evaluator interprets is `"active"`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::foundation::EmailAddress;

/// Provider status value that grants access.
pub const STATUS_ACTIVE: &str = "active";

/// Status written locally when the provider deletes a subscription.
pub const STATUS_CANCELED: &str = "canceled";

/// The reconciled state of one provider subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub email: EmailAddress,
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionState {
    /// True iff this state grants paid access at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == STATUS_ACTIVE
            && self
                .current_period_end
                .map(|end| end > now)
                .unwrap_or(false)
    }
}

/// A persisted subscription row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub email: EmailAddress,
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// True iff this row grants paid access at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == STATUS_ACTIVE
            && self
                .current_period_end
                .map(|end| end > now)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(status: &str, period_end: Option<DateTime<Utc>>) -> SubscriptionState {
        SubscriptionState {
            email: EmailAddress::new("a@x.com").unwrap(),
            provider_subscription_id: "sub_1".to_string(),
            provider_customer_id: Some("cus_1".to_string()),
            status: status.to_string(),
            current_period_start: Some(Utc::now() - Duration::days(1)),
            current_period_end: period_end,
            cancel_at_period_end: false,
        }
    }

    #[test]
    fn active_with_future_period_end_grants_access() {
        let now = Utc::now();
        let s = state(STATUS_ACTIVE, Some(now + Duration::days(29)));
        assert!(s.is_active_at(now));
    }

    #[test]
    fn active_with_past_period_end_denies_access() {
        let now = Utc::now();
        let s = state(STATUS_ACTIVE, Some(now - Duration::seconds(1)));
        assert!(!s.is_active_at(now));
    }

    #[test]
    fn canceled_status_denies_access() {
        let now = Utc::now();
        let s = state(STATUS_CANCELED, Some(now + Duration::days(29)));
        assert!(!s.is_active_at(now));
    }

    #[test]
    fn missing_period_end_denies_access() {
        let now = Utc::now();
        let s = state(STATUS_ACTIVE, None);
        assert!(!s.is_active_at(now));
    }

    #[test]
    fn unknown_provider_status_denies_access() {
        let now = Utc::now();
        let s = state("past_due", Some(now + Duration::days(29)));
        assert!(!s.is_active_at(now));
    }
}
