//! CreatePortalSessionHandler - Command handler for billing portal access.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::ports::{CheckoutBridge, LedgerReader};

/// Command to create a billing portal session for an identity.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    pub email: String,
    pub return_url: String,
}

/// Result of creating a portal session.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionResult {
    pub portal_url: String,
}

/// Handler for creating billing portal sessions.
pub struct CreatePortalSessionHandler {
    reader: Arc<dyn LedgerReader>,
    bridge: Arc<dyn CheckoutBridge>,
}

impl CreatePortalSessionHandler {
    pub fn new(reader: Arc<dyn LedgerReader>, bridge: Arc<dyn CheckoutBridge>) -> Self {
        Self { reader, bridge }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<CreatePortalSessionResult, DomainError> {
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

        let customer_id = subscription.provider_customer_id.ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription has no provider customer associated",
            )
        })?;

        let portal = self
            .bridge
            .create_portal_session(&customer_id, &cmd.return_url)
            .await
            .map_err(DomainError::from)?;

        Ok(CreatePortalSessionResult {
            portal_url: portal.url,
        })
    }
}
