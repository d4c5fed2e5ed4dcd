//! PostgreSQL implementation of PaymentLinkStore.
//!
//! All lifecycle transitions are single statements so the store's own
//! guarantees carry the concurrency requirements: redemption is one
//! conditional UPDATE, and issuing replaces dead links in the same INSERT
//! that detects live ones.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::domain::links::{generate_token, IssuedLink, PaymentLink};
use crate::ports::PaymentLinkStore;

/// PostgreSQL implementation of the PaymentLinkStore port.
pub struct PostgresPaymentLinkStore {
    pool: PgPool,
    ttl: Duration,
}

impl PostgresPaymentLinkStore {
    /// Creates a new store issuing links valid for `ttl`.
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

/// Database row representation of a payment link.
#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    email: String,
    token: String,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<LinkRow> for PaymentLink {
    type Error = DomainError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(&row.email).map_err(|e| {
            DomainError::database(format!("Invalid email in payment_links row: {}", e))
        })?;
        Ok(PaymentLink {
            id: row.id,
            email,
            token: row.token,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl PaymentLinkStore for PostgresPaymentLinkStore {
    async fn issue(&self, email: &EmailAddress) -> Result<IssuedLink, DomainError> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + self.ttl;

        // One statement: insert, or take over the email's row if its link is
        // dead. A live link survives untouched and zero rows come back.
        let result = sqlx::query(
            r#"
            INSERT INTO payment_links (id, email, token, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            ON CONFLICT (email) DO UPDATE SET
                token = EXCLUDED.token,
                expires_at = EXCLUDED.expires_at,
                used = FALSE
            WHERE payment_links.used = TRUE OR payment_links.expires_at <= $5
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.as_str())
        .bind(&token)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to issue payment link: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::LinkConflict,
                format!("An active payment link already exists for {}", email),
            ));
        }

        Ok(IssuedLink { token, expires_at })
    }

    async fn renew(&self, token: &str) -> Result<IssuedLink, DomainError> {
        let new_token = generate_token();
        let expires_at = Utc::now() + self.ttl;

        let result = sqlx::query(
            r#"
            UPDATE payment_links
            SET token = $2, expires_at = $3, used = FALSE
            WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(&new_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to renew payment link: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::LinkNotFound,
                "No payment link was found for this token",
            ));
        }

        Ok(IssuedLink {
            token: new_token,
            expires_at,
        })
    }

    async fn redeem(&self, token: &str) -> Result<EmailAddress, DomainError> {
        // The check and the flip are one conditional UPDATE; of any number
        // of concurrent redemptions, exactly one sees the row match.
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE payment_links
            SET used = TRUE
            WHERE token = $1 AND used = FALSE AND expires_at > $2
            RETURNING email
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to redeem payment link: {}", e)))?;

        match row {
            Some((email,)) => EmailAddress::new(&email).map_err(|e| {
                DomainError::database(format!("Invalid email in payment_links row: {}", e))
            }),
            None => Err(DomainError::new(
                ErrorCode::LinkInvalidOrExpired,
                "Payment link is invalid, already used, or expired",
            )),
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PaymentLink>, DomainError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, email, token, expires_at, used, created_at
            FROM payment_links
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment link: {}", e)))?;

        row.map(PaymentLink::try_from).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentLink>, DomainError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, email, token, expires_at, used, created_at
            FROM payment_links
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment link: {}", e)))?;

        row.map(PaymentLink::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<PaymentLink>, DomainError> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, email, token, expires_at, used, created_at
            FROM payment_links
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payment links: {}", e)))?;

        rows.into_iter().map(PaymentLink::try_from).collect()
    }
}
