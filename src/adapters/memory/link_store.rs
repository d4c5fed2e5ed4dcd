//! In-memory implementation of PaymentLinkStore.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::domain::links::{IssuedLink, LinkStatus, PaymentLink};
use crate::ports::PaymentLinkStore;

/// In-memory PaymentLinkStore keyed by email.
///
/// The single mutex plays the role the conditional UPDATE plays in the
/// PostgreSQL adapter: check and flip happen under one critical section.
pub struct InMemoryPaymentLinkStore {
    links: Mutex<HashMap<EmailAddress, PaymentLink>>,
    ttl: Duration,
}

impl InMemoryPaymentLinkStore {
    /// Creates a store issuing links valid for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            links: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl PaymentLinkStore for InMemoryPaymentLinkStore {
    async fn issue(&self, email: &EmailAddress) -> Result<IssuedLink, DomainError> {
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();

        if let Some(existing) = links.get(email) {
            if existing.status(now) == LinkStatus::Active {
                return Err(DomainError::new(
                    ErrorCode::LinkConflict,
                    format!("An active payment link already exists for {}", email),
                ));
            }
        }

        let link = PaymentLink::issue(email.clone(), self.ttl, now);
        let issued = link.issued();
        links.insert(email.clone(), link);
        Ok(issued)
    }

    async fn renew(&self, token: &str) -> Result<IssuedLink, DomainError> {
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();

        let link = links
            .values_mut()
            .find(|link| link.token == token)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::LinkNotFound,
                    "No payment link was found for this token",
                )
            })?;

        Ok(link.renew(self.ttl, now))
    }

    async fn redeem(&self, token: &str) -> Result<EmailAddress, DomainError> {
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();

        let link = links.values_mut().find(|link| link.token == token);
        if let Some(link) = link {
            if link.redeem_at(now) {
                return Ok(link.email.clone());
            }
        }
        Err(DomainError::new(
            ErrorCode::LinkInvalidOrExpired,
            "Payment link is invalid, already used, or expired",
        ))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentLink>, DomainError> {
        let links = self.links.lock().unwrap();
        Ok(links.values().find(|link| link.token == token).cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentLink>, DomainError> {
        Ok(self.links.lock().unwrap().get(email).cloned())
    }

    async fn list(&self) -> Result<Vec<PaymentLink>, DomainError> {
        Ok(self.links.lock().unwrap().values().cloned().collect())
    }
}
