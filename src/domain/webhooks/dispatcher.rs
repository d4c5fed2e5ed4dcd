//! Webhook event dispatcher.
//!
//! Routes verified provider events to the matching reconciliation handler.
//! The dispatcher is the only component that invokes ledger mutations, so
//! every state transition funnels through this single entry point.
//!
//! ## Delivery semantics
//!
//! The provider delivers at least once, with retries and no ordering
//! guarantee. Every handler is therefore idempotent: ledger inserts are
//! keyed by provider object id (conflict is success) and subscription state
//! is upserted by provider subscription id. Re-delivery converges to the
//! same local state.
//!
//! ## Acknowledgement
//!
//! Once persistence succeeds the event is acknowledged even when nothing was
//! applied (duplicate, unrecognized type, missing identity); only failures
//! that left state unreconciled surface as retryable errors.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::foundation::EmailAddress;
use crate::domain::ledger::{NewPayment, PaymentStatus, SubscriptionState};
use crate::ports::{
    BridgeSubscription, CheckoutBridge, LedgerWriter, RecordOutcome, SubscriptionPatch,
    SubscriptionUpdateOutcome,
};

use super::errors::WebhookError;
use super::event::{
    CheckoutSessionObject, EventKind, InvoiceObject, PaymentIntentObject, ProviderEvent,
    SubscriptionObject,
};

/// What the dispatcher did with an event. All variants acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new ledger row was appended.
    PaymentRecorded,
    /// The provider id already had a ledger row.
    DuplicatePayment,
    /// Subscription state was inserted or refreshed from bridge truth.
    SubscriptionUpserted,
    /// An existing subscription row absorbed field changes.
    SubscriptionUpdated,
    /// The subscription row already held the delivered values.
    SubscriptionUnchanged,
    /// The subscription row was marked canceled.
    SubscriptionCanceled,
    /// Recognized event with nothing to apply (reason logged).
    Ignored(&'static str),
    /// Event could not be attributed to an identity (reason logged).
    Dropped(&'static str),
}

/// Dispatches verified provider events to reconciliation handlers.
pub struct EventDispatcher {
    ledger: Arc<dyn LedgerWriter>,
    bridge: Arc<dyn CheckoutBridge>,
}

impl EventDispatcher {
    pub fn new(ledger: Arc<dyn LedgerWriter>, bridge: Arc<dyn CheckoutBridge>) -> Self {
        Self { ledger, bridge }
    }

    /// Classifies and applies one verified event.
    pub async fn dispatch(&self, event: &ProviderEvent) -> Result<DispatchOutcome, WebhookError> {
        let outcome = match event.kind() {
            EventKind::PaymentSucceeded => {
                self.on_payment_intent(event, PaymentStatus::Succeeded).await
            }
            EventKind::PaymentFailed => {
                self.on_payment_intent(event, PaymentStatus::Failed).await
            }
            EventKind::CheckoutCompleted => self.on_checkout_completed(event).await,
            EventKind::InvoicePaid => self.on_invoice_paid(event).await,
            EventKind::SubscriptionCreated => {
                // Initial state is established by checkout completion, which
                // may arrive before or after this event.
                Ok(DispatchOutcome::Ignored(
                    "subscription state is established by checkout completion",
                ))
            }
            EventKind::SubscriptionUpdated => self.on_subscription_updated(event).await,
            EventKind::SubscriptionDeleted => self.on_subscription_deleted(event).await,
            EventKind::Unrecognized => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "acknowledging unrecognized webhook event type"
                );
                Ok(DispatchOutcome::Ignored("unrecognized event type"))
            }
        }?;

        match &outcome {
            DispatchOutcome::Ignored(reason) | DispatchOutcome::Dropped(reason) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    reason,
                    "webhook event acknowledged without mutation"
                );
            }
            applied => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    outcome = ?applied,
                    "webhook event reconciled"
                );
            }
        }

        Ok(outcome)
    }

    async fn on_payment_intent(
        &self,
        event: &ProviderEvent,
        status: PaymentStatus,
    ) -> Result<DispatchOutcome, WebhookError> {
        let intent: PaymentIntentObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let email = match intent.resolved_email().map(EmailAddress::new) {
            Some(Ok(email)) => email,
            Some(Err(_)) | None => {
                tracing::warn!(
                    event_id = %event.id,
                    payment_intent_id = %intent.id,
                    "payment intent carries no usable identity, dropping"
                );
                return Ok(DispatchOutcome::Dropped("no identity on payment intent"));
            }
        };

        let payment = NewPayment::one_time(
            email,
            &intent.id,
            intent.customer.clone(),
            status,
            intent.amount,
            &intent.currency,
        );

        match self.ledger.record_payment(payment).await? {
            RecordOutcome::Recorded => Ok(DispatchOutcome::PaymentRecorded),
            RecordOutcome::AlreadyRecorded => Ok(DispatchOutcome::DuplicatePayment),
        }
    }

    async fn on_checkout_completed(
        &self,
        event: &ProviderEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let session: CheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if !session.is_subscription_mode() {
            // One-time sessions settle through payment intent events.
            return Ok(DispatchOutcome::Ignored("one-time checkout session"));
        }

        let email = match session.resolved_email().map(EmailAddress::new) {
            Some(Ok(email)) => email,
            Some(Err(_)) | None => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    "checkout session carries no usable identity, dropping"
                );
                return Ok(DispatchOutcome::Dropped("no identity on checkout session"));
            }
        };

        let subscription_id = session
            .subscription
            .as_deref()
            .ok_or(WebhookError::MissingField("subscription"))?;

        // The session only names the subscription; full state comes from
        // the bridge so the row reflects provider truth at upsert time.
        let subscription = self
            .bridge
            .retrieve_subscription(subscription_id)
            .await
            .map_err(|e| WebhookError::Upstream(e.to_string()))?;

        self.ledger
            .upsert_subscription(subscription_state(email, &subscription))
            .await?;

        Ok(DispatchOutcome::SubscriptionUpserted)
    }

    async fn on_invoice_paid(
        &self,
        event: &ProviderEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(subscription_id) = invoice.subscription.clone() else {
            return Ok(DispatchOutcome::Ignored("invoice not tied to a subscription"));
        };

        let email = match invoice.customer_email.as_deref().map(EmailAddress::new) {
            Some(Ok(email)) => email,
            Some(Err(_)) | None => {
                tracing::warn!(
                    event_id = %event.id,
                    invoice_id = %invoice.id,
                    "invoice carries no usable identity, dropping"
                );
                return Ok(DispatchOutcome::Dropped("no identity on invoice"));
            }
        };

        let period = invoice
            .period()
            .ok_or(WebhookError::MissingField("lines.data[0].period"))?;
        let period_start = unix_ts(period.start)
            .ok_or(WebhookError::MissingField("lines.data[0].period.start"))?;
        let period_end = unix_ts(period.end)
            .ok_or(WebhookError::MissingField("lines.data[0].period.end"))?;

        let payment = NewPayment::subscription_invoice(
            email,
            &invoice.id,
            subscription_id,
            invoice.customer.clone(),
            invoice.amount_paid,
            &invoice.currency,
            period_start,
            period_end,
        );

        match self.ledger.record_payment(payment).await? {
            RecordOutcome::Recorded => Ok(DispatchOutcome::PaymentRecorded),
            RecordOutcome::AlreadyRecorded => Ok(DispatchOutcome::DuplicatePayment),
        }
    }

    async fn on_subscription_updated(
        &self,
        event: &ProviderEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let patch = SubscriptionPatch {
            provider_subscription_id: subscription.id.clone(),
            status: subscription.status.clone(),
            current_period_start: subscription.current_period_start.and_then(unix_ts),
            current_period_end: subscription.current_period_end.and_then(unix_ts),
            cancel_at_period_end: subscription.cancel_at_period_end,
        };

        match self.ledger.apply_subscription_update(patch).await? {
            SubscriptionUpdateOutcome::Applied => Ok(DispatchOutcome::SubscriptionUpdated),
            SubscriptionUpdateOutcome::Unchanged => Ok(DispatchOutcome::SubscriptionUnchanged),
            SubscriptionUpdateOutcome::NotFound => {
                // Checkout completion has not landed yet; its upsert will
                // fetch current provider truth and absorb this change.
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    "subscription update for unknown local row"
                );
                Ok(DispatchOutcome::Ignored("no local subscription row"))
            }
        }
    }

    async fn on_subscription_deleted(
        &self,
        event: &ProviderEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        match self
            .ledger
            .mark_subscription_canceled(&subscription.id)
            .await?
        {
            SubscriptionUpdateOutcome::Applied => Ok(DispatchOutcome::SubscriptionCanceled),
            SubscriptionUpdateOutcome::Unchanged => Ok(DispatchOutcome::SubscriptionUnchanged),
            SubscriptionUpdateOutcome::NotFound => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    "subscription deletion for unknown local row"
                );
                Ok(DispatchOutcome::Ignored("no local subscription row"))
            }
        }
    }
}

/// Full subscription state from bridge truth plus the resolved identity.
fn subscription_state(email: EmailAddress, sub: &BridgeSubscription) -> SubscriptionState {
    SubscriptionState {
        email,
        provider_subscription_id: sub.id.clone(),
        provider_customer_id: Some(sub.customer.clone()),
        status: sub.status.clone(),
        current_period_start: unix_ts(sub.current_period_start),
        current_period_end: unix_ts(sub.current_period_end),
        cancel_at_period_end: sub.cancel_at_period_end,
    }
}

/// Converts a provider Unix timestamp to UTC, rejecting out-of-range values.
fn unix_ts(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::DomainError;
    use crate::domain::ledger::PaymentKind;
    use crate::ports::{
        BridgeError, CheckoutSession, CreateCheckoutSessionRequest, PaymentIntent, PortalSession,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct MockLedger {
        payments: Mutex<Vec<NewPayment>>,
        subscriptions: Mutex<HashMap<String, SubscriptionState>>,
        fail_writes: bool,
    }

    impl MockLedger {
        fn new() -> Self {
            Self::default()
        }

        fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        fn with_subscription(state: SubscriptionState) -> Self {
            let ledger = Self::default();
            ledger
                .subscriptions
                .lock()
                .unwrap()
                .insert(state.provider_subscription_id.clone(), state);
            ledger
        }

        fn payment_count(&self) -> usize {
            self.payments.lock().unwrap().len()
        }

        fn subscription(&self, id: &str) -> Option<SubscriptionState> {
            self.subscriptions.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl LedgerWriter for MockLedger {
        async fn record_payment(
            &self,
            payment: NewPayment,
        ) -> Result<RecordOutcome, DomainError> {
            if self.fail_writes {
                return Err(DomainError::database("write refused"));
            }
            let mut payments = self.payments.lock().unwrap();
            let duplicate = payments
                .iter()
                .any(|p| p.provider_key() == payment.provider_key());
            if duplicate {
                return Ok(RecordOutcome::AlreadyRecorded);
            }
            payments.push(payment);
            Ok(RecordOutcome::Recorded)
        }

        async fn upsert_subscription(
            &self,
            state: SubscriptionState,
        ) -> Result<(), DomainError> {
            if self.fail_writes {
                return Err(DomainError::database("write refused"));
            }
            self.subscriptions
                .lock()
                .unwrap()
                .insert(state.provider_subscription_id.clone(), state);
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
            if existing.status == crate::domain::ledger::STATUS_CANCELED {
                return Ok(SubscriptionUpdateOutcome::Unchanged);
            }
            existing.status = crate::domain::ledger::STATUS_CANCELED.to_string();
            Ok(SubscriptionUpdateOutcome::Applied)
        }
    }

    struct MockBridge {
        subscription: Option<BridgeSubscription>,
        fail: bool,
    }

    impl MockBridge {
        fn with_subscription(id: &str) -> Self {
            Self {
                subscription: Some(BridgeSubscription {
                    id: id.to_string(),
                    customer: "cus_1".to_string(),
                    status: "active".to_string(),
                    current_period_start: 1704067200,
                    current_period_end: 1706745600,
                    cancel_at_period_end: false,
                }),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                subscription: None,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl CheckoutBridge for MockBridge {
        async fn create_payment_intent(
            &self,
            _amount_minor: i64,
            _currency: &str,
            _metadata: HashMap<String, String>,
        ) -> Result<PaymentIntent, BridgeError> {
            unimplemented!("not exercised by dispatcher tests")
        }

        async fn create_checkout_session(
            &self,
            _request: CreateCheckoutSessionRequest,
        ) -> Result<CheckoutSession, BridgeError> {
            unimplemented!("not exercised by dispatcher tests")
        }

        async fn retrieve_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<BridgeSubscription, BridgeError> {
            if self.fail {
                return Err(BridgeError::Network("connection reset".to_string()));
            }
            self.subscription
                .clone()
                .filter(|s| s.id == subscription_id)
                .ok_or_else(|| BridgeError::NotFound(subscription_id.to_string()))
        }

        async fn update_subscription(
            &self,
            _subscription_id: &str,
            _cancel_at_period_end: bool,
        ) -> Result<BridgeSubscription, BridgeError> {
            unimplemented!("not exercised by dispatcher tests")
        }

        async fn create_portal_session(
            &self,
            _customer_id: &str,
            _return_url: &str,
        ) -> Result<PortalSession, BridgeError> {
            unimplemented!("not exercised by dispatcher tests")
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════

    fn event(event_type: &str, object: serde_json::Value) -> ProviderEvent {
        serde_json::from_value(json!({
            "id": "evt_test",
            "type": event_type,
            "created": 1704067200,
            "data": { "object": object },
            "livemode": false
        }))
        .unwrap()
    }

    fn intent_event(intent_id: &str, email: Option<&str>) -> ProviderEvent {
        let mut object = json!({
            "id": intent_id,
            "amount": 200,
            "currency": "pln",
            "customer": "cus_1"
        });
        if let Some(email) = email {
            object["receipt_email"] = json!(email);
        }
        event("payment_intent.succeeded", object)
    }

    fn dispatcher(ledger: Arc<MockLedger>, bridge: Arc<MockBridge>) -> EventDispatcher {
        EventDispatcher::new(ledger, bridge)
    }

    fn active_state(id: &str) -> SubscriptionState {
        SubscriptionState {
            email: EmailAddress::new("a@x.com").unwrap(),
            provider_subscription_id: id.to_string(),
            provider_customer_id: Some("cus_1".to_string()),
            status: "active".to_string(),
            current_period_start: unix_ts(1704067200),
            current_period_end: unix_ts(1706745600),
            cancel_at_period_end: false,
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Payment Intent Events
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_succeeded_appends_one_time_row() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let outcome = d.dispatch(&intent_event("pi_1", Some("a@x.com"))).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::PaymentRecorded);
        let payments = ledger.payments.lock().unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].kind, PaymentKind::OneTime);
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
        assert_eq!(payments[0].email.as_str(), "a@x.com");
        assert_eq!(payments[0].provider_key(), Some("pi_1"));
    }

    #[tokio::test]
    async fn duplicate_payment_succeeded_leaves_one_row() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let first = d.dispatch(&intent_event("pi_1", Some("a@x.com"))).await.unwrap();
        let second = d.dispatch(&intent_event("pi_1", Some("a@x.com"))).await.unwrap();

        assert_eq!(first, DispatchOutcome::PaymentRecorded);
        assert_eq!(second, DispatchOutcome::DuplicatePayment);
        assert_eq!(ledger.payment_count(), 1);
    }

    #[tokio::test]
    async fn payment_without_identity_is_dropped() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let outcome = d.dispatch(&intent_event("pi_1", None)).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Dropped(_)));
        assert_eq!(ledger.payment_count(), 0);
    }

    #[tokio::test]
    async fn payment_failed_records_failed_row() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let mut e = intent_event("pi_2", Some("a@x.com"));
        e.event_type = "payment_intent.payment_failed".to_string();
        let outcome = d.dispatch(&e).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::PaymentRecorded);
        assert_eq!(
            ledger.payments.lock().unwrap()[0].status,
            PaymentStatus::Failed
        );
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_as_retryable() {
        let ledger = Arc::new(MockLedger::failing());
        let d = dispatcher(ledger, Arc::new(MockBridge::with_subscription("sub_1")));

        let err = d
            .dispatch(&intent_event("pi_1", Some("a@x.com")))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Persistence(_)));
        assert!(err.is_retryable());
    }

    // ════════════════════════════════════════════════════════════════════════
    // Checkout Completion Events
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_checkout_upserts_from_bridge_truth() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_1",
                "customer": "cus_1",
                "customer_details": { "email": "a@x.com" }
            }),
        );
        let outcome = d.dispatch(&e).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::SubscriptionUpserted);
        let state = ledger.subscription("sub_1").unwrap();
        assert_eq!(state.status, "active");
        assert_eq!(state.email.as_str(), "a@x.com");
        assert_eq!(state.provider_customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn one_time_checkout_is_ignored() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = event(
            "checkout.session.completed",
            json!({ "id": "cs_1", "mode": "payment" }),
        );
        let outcome = d.dispatch(&e).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        assert!(ledger.subscriptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_checkout_without_subscription_id_is_rejected() {
        let d = dispatcher(
            Arc::new(MockLedger::new()),
            Arc::new(MockBridge::with_subscription("sub_1")),
        );

        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "mode": "subscription",
                "customer_details": { "email": "a@x.com" }
            }),
        );
        let err = d.dispatch(&e).await.unwrap_err();

        assert!(matches!(err, WebhookError::MissingField("subscription")));
    }

    #[tokio::test]
    async fn bridge_failure_during_checkout_is_retryable() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::failing()));

        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_1",
                "customer_details": { "email": "a@x.com" }
            }),
        );
        let err = d.dispatch(&e).await.unwrap_err();

        assert!(matches!(err, WebhookError::Upstream(_)));
        assert!(err.is_retryable());
        assert!(ledger.subscriptions.lock().unwrap().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════
    // Invoice Events
    // ════════════════════════════════════════════════════════════════════════

    fn invoice_event(invoice_id: &str) -> ProviderEvent {
        event(
            "invoice.paid",
            json!({
                "id": invoice_id,
                "amount_paid": 2900,
                "currency": "pln",
                "customer": "cus_1",
                "customer_email": "a@x.com",
                "subscription": "sub_1",
                "lines": {
                    "data": [ { "period": { "start": 1704067200, "end": 1706745600 } } ]
                }
            }),
        )
    }

    #[tokio::test]
    async fn invoice_paid_appends_subscription_row_with_period() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let outcome = d.dispatch(&invoice_event("in_1")).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::PaymentRecorded);
        let payments = ledger.payments.lock().unwrap();
        assert_eq!(payments[0].kind, PaymentKind::Subscription);
        assert_eq!(payments[0].provider_key(), Some("in_1"));
        assert_eq!(payments[0].period_start, unix_ts(1704067200));
        assert_eq!(payments[0].period_end, unix_ts(1706745600));
    }

    #[tokio::test]
    async fn duplicate_invoice_paid_leaves_one_row() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        d.dispatch(&invoice_event("in_1")).await.unwrap();
        let second = d.dispatch(&invoice_event("in_1")).await.unwrap();

        assert_eq!(second, DispatchOutcome::DuplicatePayment);
        assert_eq!(ledger.payment_count(), 1);
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_ignored() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = event(
            "invoice.paid",
            json!({
                "id": "in_1",
                "amount_paid": 500,
                "currency": "pln",
                "customer_email": "a@x.com"
            }),
        );
        let outcome = d.dispatch(&e).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        assert_eq!(ledger.payment_count(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Subscription Lifecycle Events
    // ════════════════════════════════════════════════════════════════════════

    fn subscription_event(event_type: &str, id: &str, status: &str) -> ProviderEvent {
        event(
            event_type,
            json!({
                "id": id,
                "customer": "cus_1",
                "status": status,
                "current_period_start": 1704067200,
                "current_period_end": 1706745600,
                "cancel_at_period_end": false
            }),
        )
    }

    #[tokio::test]
    async fn subscription_created_is_acknowledged_without_mutation() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.created", "sub_1", "active");
        let outcome = d.dispatch(&e).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        assert!(ledger.subscriptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_updated_applies_changes() {
        let ledger = Arc::new(MockLedger::with_subscription(active_state("sub_1")));
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.updated", "sub_1", "past_due");
        let outcome = d.dispatch(&e).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::SubscriptionUpdated);
        assert_eq!(ledger.subscription("sub_1").unwrap().status, "past_due");
    }

    #[tokio::test]
    async fn repeated_subscription_updated_converges() {
        let ledger = Arc::new(MockLedger::with_subscription(active_state("sub_1")));
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.updated", "sub_1", "past_due");
        let first = d.dispatch(&e).await.unwrap();
        let second = d.dispatch(&e).await.unwrap();
        let third = d.dispatch(&e).await.unwrap();

        assert_eq!(first, DispatchOutcome::SubscriptionUpdated);
        assert_eq!(second, DispatchOutcome::SubscriptionUnchanged);
        assert_eq!(third, DispatchOutcome::SubscriptionUnchanged);
        assert_eq!(ledger.subscription("sub_1").unwrap().status, "past_due");
    }

    #[tokio::test]
    async fn subscription_updated_for_unknown_row_is_ignored() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.updated", "sub_missing", "active");
        let outcome = d.dispatch(&e).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
    }

    #[tokio::test]
    async fn subscription_deleted_cancels_but_keeps_row() {
        let ledger = Arc::new(MockLedger::with_subscription(active_state("sub_1")));
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.deleted", "sub_1", "canceled");
        let outcome = d.dispatch(&e).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::SubscriptionCanceled);
        let state = ledger.subscription("sub_1").unwrap();
        assert_eq!(state.status, "canceled");
    }

    #[tokio::test]
    async fn repeated_subscription_deleted_is_unchanged() {
        let ledger = Arc::new(MockLedger::with_subscription(active_state("sub_1")));
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = subscription_event("customer.subscription.deleted", "sub_1", "canceled");
        d.dispatch(&e).await.unwrap();
        let second = d.dispatch(&e).await.unwrap();

        assert_eq!(second, DispatchOutcome::SubscriptionUnchanged);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Unrecognized Events
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unrecognized_event_is_acknowledged() {
        let ledger = Arc::new(MockLedger::new());
        let d = dispatcher(ledger.clone(), Arc::new(MockBridge::with_subscription("sub_1")));

        let e = event("charge.dispute.created", json!({ "id": "dp_1" }));
        let outcome = d.dispatch(&e).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        assert_eq!(ledger.payment_count(), 0);
        assert!(ledger.subscriptions.lock().unwrap().is_empty());
    }
}
