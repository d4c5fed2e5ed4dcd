//! CancelSubscriptionHandler - Command handler for cancelling at period end.
//!
//! The bridge is told to cancel; the local row is deliberately left alone.
//! Provider truth flows back through the subscription-updated webhook, the
//! same path every other subscription change takes.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::ports::{CheckoutBridge, LedgerReader};

/// Command to cancel an identity's subscription at period end.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub email: String,
}

/// Result of requesting cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub provider_subscription_id: String,
    pub cancel_at_period_end: bool,
}

/// Handler for subscription cancellation.
pub struct CancelSubscriptionHandler {
    reader: Arc<dyn LedgerReader>,
    bridge: Arc<dyn CheckoutBridge>,
}

impl CancelSubscriptionHandler {
    pub fn new(reader: Arc<dyn LedgerReader>, bridge: Arc<dyn CheckoutBridge>) -> Self {
        Self { reader, bridge }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, DomainError> {
        let email = EmailAddress::new(&cmd.email)?;

        let subscription = self
            .reader
            .subscription_for_email(&email)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("No subscription found for {}", email),
                )
            })?;

        let updated = self
            .bridge
            .update_subscription(&subscription.provider_subscription_id, true)
            .await
            .map_err(DomainError::from)?;

        tracing::info!(
            email = %email,
            subscription_id = %updated.id,
            "subscription cancellation requested at period end"
        );

        Ok(CancelSubscriptionResult {
            provider_subscription_id: updated.id,
            cancel_at_period_end: updated.cancel_at_period_end,
        })
    }
}
