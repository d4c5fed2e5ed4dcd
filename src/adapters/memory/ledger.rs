//! In-memory implementation of the ledger ports.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::ledger::{
    NewPayment, PaymentRecord, SubscriptionRecord, SubscriptionState, STATUS_CANCELED,
};
use crate::ports::{
    LedgerReader, LedgerWriter, RecordOutcome, SubscriptionPatch, SubscriptionUpdateOutcome,
};

/// In-memory ledger: payments keyed for idempotency by provider id,
/// subscriptions keyed by provider subscription id.
#[derive(Default)]
pub struct InMemoryLedger {
    payments: Mutex<Vec<PaymentRecord>>,
    subscriptions: Mutex<HashMap<String, SubscriptionRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger rows (test assertions).
    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    /// Current state of a subscription row (test assertions).
    pub fn subscription(&self, provider_subscription_id: &str) -> Option<SubscriptionRecord> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(provider_subscription_id)
            .cloned()
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn record_payment(&self, payment: NewPayment) -> Result<RecordOutcome, DomainError> {
        let mut payments = self.payments.lock().unwrap();

        let duplicate = payment.provider_key().is_some()
            && payments.iter().any(|existing| {
                existing.refs.payment_intent_id.as_deref() == payment.provider_key()
                    || existing.refs.invoice_id.as_deref() == payment.provider_key()
            });
        if duplicate {
            return Ok(RecordOutcome::AlreadyRecorded);
        }

        payments.push(PaymentRecord {
            id: Uuid::new_v4(),
            email: payment.email,
            refs: payment.refs,
            kind: payment.kind,
            status: payment.status,
            amount_minor: payment.amount_minor,
            currency: payment.currency,
            period_start: payment.period_start,
            period_end: payment.period_end,
            created_at: Utc::now(),
        });
        Ok(RecordOutcome::Recorded)
    }

    async fn upsert_subscription(&self, state: SubscriptionState) -> Result<(), DomainError> {
        let now = Utc::now();
        let mut subscriptions = self.subscriptions.lock().unwrap();

        match subscriptions.get_mut(&state.provider_subscription_id) {
            Some(existing) => {
                let changed = existing.status != state.status
                    || existing.current_period_start != state.current_period_start
                    || existing.current_period_end != state.current_period_end
                    || existing.cancel_at_period_end != state.cancel_at_period_end;
                existing.status = state.status;
                existing.current_period_start = state.current_period_start;
                existing.current_period_end = state.current_period_end;
                existing.cancel_at_period_end = state.cancel_at_period_end;
                if changed {
                    existing.updated_at = now;
                }
            }
            None => {
                subscriptions.insert(
                    state.provider_subscription_id.clone(),
                    SubscriptionRecord {
                        id: Uuid::new_v4(),
                        email: state.email,
                        provider_subscription_id: state.provider_subscription_id,
                        provider_customer_id: state.provider_customer_id,
                        status: state.status,
                        current_period_start: state.current_period_start,
                        current_period_end: state.current_period_end,
                        cancel_at_period_end: state.cancel_at_period_end,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn apply_subscription_update(
        &self,
        patch: SubscriptionPatch,
    ) -> Result<SubscriptionUpdateOutcome, DomainError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let Some(existing) = subscriptions.get_mut(&patch.provider_subscription_id) else {
            return Ok(SubscriptionUpdateOutcome::NotFound);
        };

        let unchanged = existing.status == patch.status
            && existing.current_period_start == patch.current_period_start
            && existing.current_period_end == patch.current_period_end
            && existing.cancel_at_period_end == patch.cancel_at_period_end;
        if unchanged {
            return Ok(SubscriptionUpdateOutcome::Unchanged);
        }

        existing.status = patch.status;
        existing.current_period_start = patch.current_period_start;
        existing.current_period_end = patch.current_period_end;
        existing.cancel_at_period_end = patch.cancel_at_period_end;
        existing.updated_at = Utc::now();
        Ok(SubscriptionUpdateOutcome::Applied)
    }

    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionUpdateOutcome, DomainError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let Some(existing) = subscriptions.get_mut(provider_subscription_id) else {
            return Ok(SubscriptionUpdateOutcome::NotFound);
        };

        if existing.status == STATUS_CANCELED {
            return Ok(SubscriptionUpdateOutcome::Unchanged);
        }

        existing.status = STATUS_CANCELED.to_string();
        existing.updated_at = Utc::now();
        Ok(SubscriptionUpdateOutcome::Applied)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn latest_payment(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let payments = self.payments.lock().unwrap();
        Ok(payments
            .iter()
            .filter(|p| &p.email == email)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn subscription_for_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions
            .values()
            .filter(|s| &s.email == email)
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn has_active_subscription(
        &self,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions
            .values()
            .any(|s| &s.email == email && s.is_active_at(now)))
    }

    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DomainError> {
        Ok(self.payments.lock().unwrap().clone())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, DomainError> {
        Ok(self.subscriptions.lock().unwrap().values().cloned().collect())
    }
}
