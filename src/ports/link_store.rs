//! PaymentLinkStore port - persistence for single-use payment links.
//!
//! The store is the sole owner of payment-link writes. Redemption must be a
//! single atomic check-and-set: two concurrent redemptions of the same token
//! must yield exactly one success. Implementations push that guarantee to the
//! storage engine (one conditional UPDATE) rather than a read-then-write.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::links::{IssuedLink, PaymentLink};

/// Port for issuing, renewing, and redeeming payment links.
#[async_trait]
pub trait PaymentLinkStore: Send + Sync {
    /// Issues a fresh link for the email.
    ///
    /// Policy: one active link per email. Fails with `LinkConflict` if a
    /// live link already exists; a dead link (used or expired) is replaced.
    async fn issue(&self, email: &EmailAddress) -> Result<IssuedLink, DomainError>;

    /// Atomically replaces token and expiry for an existing link, clearing
    /// the used flag. The prior token is invalidated by the overwrite.
    ///
    /// Fails with `LinkNotFound` for unknown tokens.
    async fn renew(&self, token: &str) -> Result<IssuedLink, DomainError>;

    /// Redeems a token, marking it used and returning the associated email.
    ///
    /// Fails with `LinkInvalidOrExpired` unless the token is unused and
    /// unexpired. The used flag flips in the same atomic statement that
    /// checks it.
    async fn redeem(&self, token: &str) -> Result<EmailAddress, DomainError>;

    /// Looks up the link holding this token, if any. Read-only; redemption
    /// still goes through `redeem`.
    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentLink>, DomainError>;

    /// Looks up the link held for an email, if any.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentLink>, DomainError>;

    /// Lists all links (admin view).
    async fn list(&self) -> Result<Vec<PaymentLink>, DomainError>;
}
