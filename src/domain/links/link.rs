//! Payment link entity and lifecycle.
//!
//! A payment link is a single-use, high-entropy token that gates checkout
//! initiation for one email address. The link is consumed when checkout is
//! *initiated*, not when the payment settles; settlement is reconciled later
//! from provider webhooks.
//!
//! ## Lifecycle
//!
//! ```text
//! issue ──> Active ──redeem──> Used
//!             │ │
//!             │ └──(clock)──> Expired
//!             └──renew──> Active (new token; old token Superseded)
//! ```
//!
//! Status is derived from the stored flag and timestamps; no separate status
//! column exists to drift out of sync.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::domain::foundation::EmailAddress;

/// Number of random bytes in a link token (256 bits, hex-encoded to 64 chars).
pub const TOKEN_BYTES: usize = 32;

/// Generates a cryptographically random link token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derived lifecycle state of a payment link token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Redeemable: not used, not expired.
    Active,
    /// Consumed by a checkout initiation.
    Used,
    /// Past its expiry timestamp without being used.
    Expired,
    /// Replaced by a renew; the presented token is no longer the current one.
    Superseded,
}

/// A single-use payment link for one email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub id: Uuid,
    pub email: EmailAddress,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// The caller-visible result of issuing or renewing a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLink {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl PaymentLink {
    /// Creates a fresh Active link for the given email.
    pub fn issue(email: EmailAddress, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            token: generate_token(),
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }

    /// Derived status of the link's current token.
    pub fn status(&self, now: DateTime<Utc>) -> LinkStatus {
        if self.used {
            LinkStatus::Used
        } else if now >= self.expires_at {
            LinkStatus::Expired
        } else {
            LinkStatus::Active
        }
    }

    /// Derived status of a presented token against this link.
    ///
    /// A token that does not match the current one was overwritten by a
    /// renew and is reported as Superseded.
    pub fn status_of_token(&self, token: &str, now: DateTime<Utc>) -> LinkStatus {
        if token != self.token {
            LinkStatus::Superseded
        } else {
            self.status(now)
        }
    }

    /// True iff the current token can still be redeemed.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == LinkStatus::Active
    }

    /// Consumes the link at checkout initiation.
    ///
    /// Returns false without mutating if the link is not redeemable. The
    /// persistent store performs the same check-and-set as one conditional
    /// UPDATE; this method is the in-memory equivalent.
    pub fn redeem_at(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_redeemable(now) {
            return false;
        }
        self.used = true;
        true
    }

    /// Replaces the token and expiry, clearing the used flag.
    ///
    /// The previous token is invalidated by the overwrite.
    pub fn renew(&mut self, ttl: Duration, now: DateTime<Utc>) -> IssuedLink {
        self.token = generate_token();
        self.expires_at = now + ttl;
        self.used = false;
        IssuedLink {
            token: self.token.clone(),
            expires_at: self.expires_at,
        }
    }

    /// The issued view of this link.
    pub fn issued(&self) -> IssuedLink {
        IssuedLink {
            token: self.token.clone(),
            expires_at: self.expires_at,
        }
    }
}
