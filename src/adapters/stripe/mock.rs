//! In-memory Checkout Bridge for tests and offline development.
//!
//! Returns deterministic provider objects and records enough state for
//! assertions: created intents, canned subscriptions, and cancel-flag
//! updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    BridgeError, BridgeSubscription, CheckoutBridge, CheckoutSession,
    CreateCheckoutSessionRequest, PaymentIntent, PortalSession,
};

/// Mock Checkout Bridge backed by in-memory state.
#[derive(Default)]
pub struct MockCheckoutBridge {
    subscriptions: Mutex<HashMap<String, BridgeSubscription>>,
    created_intents: Mutex<Vec<(PaymentIntent, HashMap<String, String>)>>,
    intent_counter: AtomicU32,
}

impl MockCheckoutBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a subscription the bridge will report.
    pub fn with_subscription(self, subscription: BridgeSubscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
        self
    }

    /// Intents created so far, with their metadata.
    pub fn created_intents(&self) -> Vec<(PaymentIntent, HashMap<String, String>)> {
        self.created_intents.lock().unwrap().clone()
    }

    /// Current state of a seeded subscription.
    pub fn subscription(&self, id: &str) -> Option<BridgeSubscription> {
        self.subscriptions.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl CheckoutBridge for MockCheckoutBridge {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, BridgeError> {
        let n = self.intent_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let intent = PaymentIntent {
            id: format!("pi_mock_{}", n),
            client_secret: format!("pi_mock_{}_secret", n),
            amount: amount_minor,
            currency: currency.to_string(),
        };
        self.created_intents
            .lock()
            .unwrap()
            .push((intent.clone(), metadata));
        Ok(intent)
    }

    async fn create_checkout_session(
        &self,
        _request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, BridgeError> {
        Ok(CheckoutSession {
            id: "cs_mock_1".to_string(),
            url: "https://checkout.stripe.com/c/pay/cs_mock_1".to_string(),
        })
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<BridgeSubscription, BridgeError> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(subscription_id.to_string()))
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<BridgeSubscription, BridgeError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| BridgeError::NotFound(subscription_id.to_string()))?;
        subscription.cancel_at_period_end = cancel_at_period_end;
        Ok(subscription.clone())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> Result<PortalSession, BridgeError> {
        Ok(PortalSession {
            id: format!("bps_mock_{}", customer_id),
            url: "https://billing.stripe.com/session/bps_mock".to_string(),
        })
    }
}
