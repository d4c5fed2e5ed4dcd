//! RenewLinkHandler - Command handler for renewing payment links.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;
use crate::ports::PaymentLinkStore;

use super::issue_link::link_url;

/// Command to renew an existing payment link by its current token.
#[derive(Debug, Clone)]
pub struct RenewLinkCommand {
    pub token: String,
}

/// Result of renewing a link.
#[derive(Debug, Clone)]
pub struct RenewLinkResult {
    /// Frontend URL embedding the replacement token.
    pub link_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Handler for renewing payment links.
///
/// Renewal atomically replaces token and expiry; the old token stops
/// working the moment this returns.
pub struct RenewLinkHandler {
    links: Arc<dyn PaymentLinkStore>,
    frontend_base_url: String,
}

impl RenewLinkHandler {
    pub fn new(links: Arc<dyn PaymentLinkStore>, frontend_base_url: impl Into<String>) -> Self {
        Self {
            links,
            frontend_base_url: frontend_base_url.into(),
        }
    }

    pub async fn handle(&self, cmd: RenewLinkCommand) -> Result<RenewLinkResult, DomainError> {
        let issued = self.links.renew(&cmd.token).await?;

        tracing::info!(expires_at = %issued.expires_at, "payment link renewed");

        Ok(RenewLinkResult {
            link_url: link_url(&self.frontend_base_url, &issued.token),
            expires_at: issued.expires_at,
        })
    }
}
