//! CreateSubscriptionSessionHandler - Command handler for starting a
//! subscription checkout flow.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::ports::{CheckoutBridge, CheckoutMode, CreateCheckoutSessionRequest};

/// Command to create a subscription checkout session.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionSessionCommand {
    pub email: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a checkout session.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionSessionResult {
    /// URL for the customer to complete checkout.
    pub checkout_url: String,
}

/// Handler for creating subscription checkout sessions.
///
/// No local state is written here: the subscription row is established when
/// the checkout-completed webhook arrives.
pub struct CreateSubscriptionSessionHandler {
    bridge: Arc<dyn CheckoutBridge>,
    price_id: String,
}

impl CreateSubscriptionSessionHandler {
    pub fn new(bridge: Arc<dyn CheckoutBridge>, price_id: impl Into<String>) -> Self {
        Self {
            bridge,
            price_id: price_id.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionSessionCommand,
    ) -> Result<CreateSubscriptionSessionResult, DomainError> {
        let email = EmailAddress::new(&cmd.email)?;

        let session = self
            .bridge
            .create_checkout_session(CreateCheckoutSessionRequest {
                mode: CheckoutMode::Subscription,
                customer_email: email.clone(),
                price_id: self.price_id.clone(),
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
            })
            .await
            .map_err(DomainError::from)?;

        tracing::info!(email = %email, session_id = %session.id, "subscription checkout session created");

        Ok(CreateSubscriptionSessionResult {
            checkout_url: session.url,
        })
    }
}
