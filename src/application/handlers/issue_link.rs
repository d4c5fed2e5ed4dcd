//! IssueLinkHandler - Command handler for issuing payment links.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::ports::PaymentLinkStore;

/// Command to issue a payment link for an identity.
#[derive(Debug, Clone)]
pub struct IssueLinkCommand {
    pub email: String,
}

/// Result of issuing a link.
#[derive(Debug, Clone)]
pub struct IssueLinkResult {
    /// Frontend URL embedding the token.
    pub link_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Handler for issuing payment links.
pub struct IssueLinkHandler {
    links: Arc<dyn PaymentLinkStore>,
    frontend_base_url: String,
}

impl IssueLinkHandler {
    pub fn new(links: Arc<dyn PaymentLinkStore>, frontend_base_url: impl Into<String>) -> Self {
        Self {
            links,
            frontend_base_url: frontend_base_url.into(),
        }
    }

    pub async fn handle(&self, cmd: IssueLinkCommand) -> Result<IssueLinkResult, DomainError> {
        let email = EmailAddress::new(&cmd.email)?;

        let issued = self.links.issue(&email).await?;

        tracing::info!(email = %email, expires_at = %issued.expires_at, "payment link issued");

        Ok(IssueLinkResult {
            link_url: link_url(&self.frontend_base_url, &issued.token),
            expires_at: issued.expires_at,
        })
    }
}

/// Builds the frontend payment URL for a token.
pub(crate) fn link_url(frontend_base_url: &str, token: &str) -> String {
    format!(
        "{}/pay?token={}",
        frontend_base_url.trim_end_matches('/'),
        token
    )
}
