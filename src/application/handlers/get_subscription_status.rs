//! GetSubscriptionStatusHandler - Query handler for paid access checks.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::ports::LedgerReader;

/// Query for an identity's subscription access.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub email: String,
}

/// Result of the access check.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusResult {
    /// True iff a subscription is active with a period end in the future.
    pub has_active: bool,
}

/// Handler answering "does this identity currently have paid access".
/// Pure read, no side effects.
pub struct GetSubscriptionStatusHandler {
    reader: Arc<dyn LedgerReader>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(reader: Arc<dyn LedgerReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, DomainError> {
        let email = EmailAddress::new(&query.email)?;

        let has_active = self
            .reader
            .has_active_subscription(&email, Utc::now())
            .await?;

        Ok(GetSubscriptionStatusResult { has_active })
    }
}
