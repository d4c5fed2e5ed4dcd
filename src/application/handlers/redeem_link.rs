//! RedeemLinkHandler - Command handler for redeeming a link and initiating
//! a one-time payment.
//!
//! Ordering matters here:
//!
//! 1. The token is checked read-only; a dead token fails before any
//!    external call, leaving no trace anywhere.
//! 2. The payment intent is created at the bridge. A bridge failure
//!    surfaces as `UpstreamError` with the link still active.
//! 3. The token is consumed by the store's atomic check-and-set. Of two
//!    concurrent redemptions that both initiated an intent, exactly one
//!    consumes the link; the loser's intent is never confirmed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{CheckoutBridge, PaymentLinkStore};

/// Command to redeem a payment link token.
#[derive(Debug, Clone)]
pub struct RedeemLinkCommand {
    pub token: String,
}

/// Result of redeeming a link: an initiated payment intent.
#[derive(Debug, Clone)]
pub struct RedeemLinkResult {
    /// Secret the frontend uses to confirm the payment.
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Handler for link redemption and payment initiation.
pub struct RedeemLinkHandler {
    links: Arc<dyn PaymentLinkStore>,
    bridge: Arc<dyn CheckoutBridge>,
    amount_minor: i64,
    currency: String,
}

impl RedeemLinkHandler {
    pub fn new(
        links: Arc<dyn PaymentLinkStore>,
        bridge: Arc<dyn CheckoutBridge>,
        amount_minor: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            links,
            bridge,
            amount_minor,
            currency: currency.into(),
        }
    }

    pub async fn handle(&self, cmd: RedeemLinkCommand) -> Result<RedeemLinkResult, DomainError> {
        // Read-only check first: a dead token must not reach the bridge.
        let link = self
            .links
            .find_by_token(&cmd.token)
            .await?
            .filter(|link| link.is_redeemable(Utc::now()))
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::LinkInvalidOrExpired,
                    "Payment link is invalid, already used, or expired",
                )
            })?;

        // The metadata email is what lets the webhook attribute the payment
        // when no receipt email is present.
        let metadata = HashMap::from([("email".to_string(), link.email.to_string())]);
        let intent = self
            .bridge
            .create_payment_intent(self.amount_minor, &self.currency, metadata)
            .await
            .map_err(DomainError::from)?;

        // Consume the token only after initiation succeeded. The atomic
        // check-and-set resolves concurrent redemptions to one winner.
        let email = self.links.redeem(&cmd.token).await?;

        tracing::info!(
            email = %email,
            payment_intent_id = %intent.id,
            "payment link redeemed, intent initiated"
        );

        Ok(RedeemLinkResult {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            amount_minor: intent.amount,
            currency: intent.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentLinkStore;
    use crate::adapters::stripe::MockCheckoutBridge;
    use crate::domain::foundation::EmailAddress;
    use crate::ports::{
        BridgeError, BridgeSubscription, CheckoutSession, CreateCheckoutSessionRequest,
        PaymentIntent, PortalSession,
    };
    use async_trait::async_trait;
    use chrono::Duration;

    /// Bridge that refuses every call.
    struct FailingBridge;

    #[async_trait]
    impl CheckoutBridge for FailingBridge {
        async fn create_payment_intent(
            &self,
            _amount_minor: i64,
            _currency: &str,
            _metadata: HashMap<String, String>,
        ) -> Result<PaymentIntent, BridgeError> {
            Err(BridgeError::Network("connection refused".to_string()))
        }

        async fn create_checkout_session(
            &self,
            _request: CreateCheckoutSessionRequest,
        ) -> Result<CheckoutSession, BridgeError> {
            Err(BridgeError::Network("connection refused".to_string()))
        }

        async fn retrieve_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<BridgeSubscription, BridgeError> {
            Err(BridgeError::Network("connection refused".to_string()))
        }

        async fn update_subscription(
            &self,
            _subscription_id: &str,
            _cancel_at_period_end: bool,
        ) -> Result<BridgeSubscription, BridgeError> {
            Err(BridgeError::Network("connection refused".to_string()))
        }

        async fn create_portal_session(
            &self,
            _customer_id: &str,
            _return_url: &str,
        ) -> Result<PortalSession, BridgeError> {
            Err(BridgeError::Network("connection refused".to_string()))
        }
    }

    fn email() -> EmailAddress {
        EmailAddress::new("a@x.com").unwrap()
    }

    async fn store_with_link() -> (Arc<InMemoryPaymentLinkStore>, String) {
        let store = Arc::new(InMemoryPaymentLinkStore::new(Duration::hours(24)));
        let issued = store.issue(&email()).await.unwrap();
        (store, issued.token)
    }

    #[tokio::test]
    async fn redeem_initiates_intent_with_email_metadata() {
        let (store, token) = store_with_link().await;
        let bridge = Arc::new(MockCheckoutBridge::new());
        let handler = RedeemLinkHandler::new(store.clone(), bridge.clone(), 200, "pln");

        let result = handler.handle(RedeemLinkCommand { token }).await.unwrap();

        assert_eq!(result.amount_minor, 200);
        assert_eq!(result.currency, "pln");
        assert!(result.client_secret.contains("secret"));

        let created = bridge.created_intents();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1.get("email").unwrap(), "a@x.com");

        let link = store.find_by_email(&email()).await.unwrap().unwrap();
        assert!(link.used);
    }

    #[tokio::test]
    async fn dead_token_fails_before_bridge_call() {
        let (store, token) = store_with_link().await;
        store.redeem(&token).await.unwrap();

        let bridge = Arc::new(MockCheckoutBridge::new());
        let handler = RedeemLinkHandler::new(store, bridge.clone(), 200, "pln");

        let err = handler.handle(RedeemLinkCommand { token }).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::LinkInvalidOrExpired);
        assert!(bridge.created_intents().is_empty());
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let store = Arc::new(InMemoryPaymentLinkStore::new(Duration::hours(24)));
        let handler =
            RedeemLinkHandler::new(store, Arc::new(MockCheckoutBridge::new()), 200, "pln");

        let err = handler
            .handle(RedeemLinkCommand {
                token: "ffffffff".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::LinkInvalidOrExpired);
    }

    #[tokio::test]
    async fn bridge_failure_leaves_link_active() {
        let (store, token) = store_with_link().await;
        let handler = RedeemLinkHandler::new(store.clone(), Arc::new(FailingBridge), 200, "pln");

        let err = handler
            .handle(RedeemLinkCommand {
                token: token.clone(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UpstreamError);
        let link = store.find_by_email(&email()).await.unwrap().unwrap();
        assert!(!link.used);
        // The link can be retried after the bridge recovers.
        assert!(store.redeem(&token).await.is_ok());
    }
}
