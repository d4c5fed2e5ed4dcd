//! PostgreSQL implementation of the ledger ports.
//!
//! Idempotency is delegated to the schema: partial unique indexes on the
//! provider payment-intent and invoice ids make `record_payment` a
//! conflict-tolerant insert, and the subscription upsert is keyed by the
//! unique provider subscription id. `updated_at` only advances when a
//! delivered value actually differs from the stored one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::ledger::{
    NewPayment, PaymentKind, PaymentRecord, PaymentStatus, ProviderRefs, SubscriptionRecord,
    SubscriptionState, STATUS_CANCELED,
};
use crate::ports::{
    LedgerReader, LedgerWriter, RecordOutcome, SubscriptionPatch, SubscriptionUpdateOutcome,
};

/// PostgreSQL implementation of LedgerWriter and LedgerReader.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new ledger backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn subscription_exists(&self, provider_subscription_id: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE stripe_subscription_id = $1)",
        )
        .bind(provider_subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check subscription: {}", e)))?;
        Ok(exists)
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    email: String,
    stripe_payment_intent_id: Option<String>,
    stripe_invoice_id: Option<String>,
    stripe_subscription_id: Option<String>,
    stripe_customer_id: Option<String>,
    kind: String,
    status: String,
    amount: i64,
    currency: String,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(&row.email)
            .map_err(|e| DomainError::database(format!("Invalid email in payments row: {}", e)))?;
        let kind = parse_kind(&row.kind)?;
        let status = parse_status(&row.status)?;

        Ok(PaymentRecord {
            id: row.id,
            email,
            refs: ProviderRefs {
                payment_intent_id: row.stripe_payment_intent_id,
                invoice_id: row.stripe_invoice_id,
                subscription_id: row.stripe_subscription_id,
                customer_id: row.stripe_customer_id,
            },
            kind,
            status,
            amount_minor: row.amount,
            currency: row.currency,
            period_start: row.period_start,
            period_end: row.period_end,
            created_at: row.created_at,
        })
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    stripe_subscription_id: String,
    stripe_customer_id: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(&row.email).map_err(|e| {
            DomainError::database(format!("Invalid email in subscriptions row: {}", e))
        })?;
        Ok(SubscriptionRecord {
            id: row.id,
            email,
            provider_subscription_id: row.stripe_subscription_id,
            provider_customer_id: row.stripe_customer_id,
            status: row.status,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_kind(s: &str) -> Result<PaymentKind, DomainError> {
    PaymentKind::parse(s)
        .ok_or_else(|| DomainError::database(format!("Invalid payment kind value: {}", s)))
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(s)
        .ok_or_else(|| DomainError::database(format!("Invalid payment status value: {}", s)))
}

#[async_trait]
impl LedgerWriter for PostgresLedger {
    async fn record_payment(&self, payment: NewPayment) -> Result<RecordOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, email, stripe_payment_intent_id, stripe_invoice_id,
                stripe_subscription_id, stripe_customer_id, kind, status,
                amount, currency, period_start, period_end, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.email.as_str())
        .bind(&payment.refs.payment_intent_id)
        .bind(&payment.refs.invoice_id)
        .bind(&payment.refs.subscription_id)
        .bind(&payment.refs.customer_id)
        .bind(payment.kind.as_str())
        .bind(payment.status.as_str())
        .bind(payment.amount_minor)
        .bind(&payment.currency)
        .bind(payment.period_start)
        .bind(payment.period_end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record payment: {}", e)))?;

        if result.rows_affected() == 1 {
            Ok(RecordOutcome::Recorded)
        } else {
            Ok(RecordOutcome::AlreadyRecorded)
        }
    }

    async fn upsert_subscription(&self, state: SubscriptionState) -> Result<(), DomainError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, email, stripe_subscription_id, stripe_customer_id, status,
                current_period_start, current_period_end, cancel_at_period_end,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (stripe_subscription_id) DO UPDATE SET
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = CASE WHEN
                    subscriptions.status IS DISTINCT FROM EXCLUDED.status
                    OR subscriptions.current_period_start IS DISTINCT FROM EXCLUDED.current_period_start
                    OR subscriptions.current_period_end IS DISTINCT FROM EXCLUDED.current_period_end
                    OR subscriptions.cancel_at_period_end IS DISTINCT FROM EXCLUDED.cancel_at_period_end
                THEN EXCLUDED.updated_at ELSE subscriptions.updated_at END
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(state.email.as_str())
        .bind(&state.provider_subscription_id)
        .bind(&state.provider_customer_id)
        .bind(&state.status)
        .bind(state.current_period_start)
        .bind(state.current_period_end)
        .bind(state.cancel_at_period_end)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert subscription: {}", e)))?;

        Ok(())
    }

    async fn apply_subscription_update(
        &self,
        patch: SubscriptionPatch,
    ) -> Result<SubscriptionUpdateOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                current_period_start = $3,
                current_period_end = $4,
                cancel_at_period_end = $5,
                updated_at = $6
            WHERE stripe_subscription_id = $1
              AND (status IS DISTINCT FROM $2
                OR current_period_start IS DISTINCT FROM $3
                OR current_period_end IS DISTINCT FROM $4
                OR cancel_at_period_end IS DISTINCT FROM $5)
            "#,
        )
        .bind(&patch.provider_subscription_id)
        .bind(&patch.status)
        .bind(patch.current_period_start)
        .bind(patch.current_period_end)
        .bind(patch.cancel_at_period_end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(SubscriptionUpdateOutcome::Applied);
        }
        if self.subscription_exists(&patch.provider_subscription_id).await? {
            Ok(SubscriptionUpdateOutcome::Unchanged)
        } else {
            Ok(SubscriptionUpdateOutcome::NotFound)
        }
    }

    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionUpdateOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, updated_at = $3
            WHERE stripe_subscription_id = $1 AND status IS DISTINCT FROM $2
            "#,
        )
        .bind(provider_subscription_id)
        .bind(STATUS_CANCELED)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to cancel subscription: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(SubscriptionUpdateOutcome::Applied);
        }
        if self.subscription_exists(provider_subscription_id).await? {
            Ok(SubscriptionUpdateOutcome::Unchanged)
        } else {
            Ok(SubscriptionUpdateOutcome::NotFound)
        }
    }
}

#[async_trait]
impl LedgerReader for PostgresLedger {
    async fn latest_payment(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, email, stripe_payment_intent_id, stripe_invoice_id,
                   stripe_subscription_id, stripe_customer_id, kind, status,
                   amount, currency, period_start, period_end, created_at
            FROM payments
            WHERE email = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment: {}", e)))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn subscription_for_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, email, stripe_subscription_id, stripe_customer_id, status,
                   current_period_start, current_period_end, cancel_at_period_end,
                   created_at, updated_at
            FROM subscriptions
            WHERE email = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn has_active_subscription(
        &self,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM subscriptions
                WHERE email = $1 AND status = 'active' AND current_period_end > $2
            )
            "#,
        )
        .bind(email.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check subscription: {}", e)))?;

        Ok(exists)
    }

    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, email, stripe_payment_intent_id, stripe_invoice_id,
                   stripe_subscription_id, stripe_customer_id, kind, status,
                   amount, currency, period_start, period_end, created_at
            FROM payments
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payments: {}", e)))?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, email, stripe_subscription_id, stripe_customer_id, status,
                   current_period_start, current_period_end, cancel_at_period_end,
                   created_at, updated_at
            FROM subscriptions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list subscriptions: {}", e)))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_works_for_all_values() {
        assert_eq!(parse_kind("one_time").unwrap(), PaymentKind::OneTime);
        assert_eq!(parse_kind("subscription").unwrap(), PaymentKind::Subscription);
    }

    #[test]
    fn parse_kind_rejects_invalid_values() {
        assert!(parse_kind("recurring").is_err());
        assert!(parse_kind("").is_err());
    }

    #[test]
    fn parse_status_works_for_all_values() {
        assert_eq!(parse_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_status("succeeded").unwrap(), PaymentStatus::Succeeded);
        assert_eq!(parse_status("failed").unwrap(), PaymentStatus::Failed);
        assert_eq!(parse_status("canceled").unwrap(), PaymentStatus::Canceled);
        assert_eq!(parse_status("refunded").unwrap(), PaymentStatus::Refunded);
    }

    #[test]
    fn parse_status_rejects_invalid_values() {
        assert!(parse_status("paid").is_err());
    }

    #[test]
    fn payment_row_converts_to_record() {
        let row = PaymentRow {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            stripe_payment_intent_id: Some("pi_1".to_string()),
            stripe_invoice_id: None,
            stripe_subscription_id: None,
            stripe_customer_id: Some("cus_1".to_string()),
            kind: "one_time".to_string(),
            status: "succeeded".to_string(),
            amount: 200,
            currency: "pln".to_string(),
            period_start: None,
            period_end: None,
            created_at: Utc::now(),
        };

        let record = PaymentRecord::try_from(row).unwrap();
        assert_eq!(record.kind, PaymentKind::OneTime);
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.refs.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[test]
    fn payment_row_with_unknown_status_fails_conversion() {
        let row = PaymentRow {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            stripe_payment_intent_id: Some("pi_1".to_string()),
            stripe_invoice_id: None,
            stripe_subscription_id: None,
            stripe_customer_id: None,
            kind: "one_time".to_string(),
            status: "settled".to_string(),
            amount: 200,
            currency: "pln".to_string(),
            period_start: None,
            period_end: None,
            created_at: Utc::now(),
        };

        assert!(PaymentRecord::try_from(row).is_err());
    }

    #[test]
    fn subscription_row_converts_to_record() {
        let now = Utc::now();
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            stripe_subscription_id: "sub_1".to_string(),
            stripe_customer_id: Some("cus_1".to_string()),
            status: "active".to_string(),
            current_period_start: Some(now),
            current_period_end: Some(now + chrono::Duration::days(30)),
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        };

        let record = SubscriptionRecord::try_from(row).unwrap();
        assert_eq!(record.provider_subscription_id, "sub_1");
        assert!(record.is_active_at(now));
    }
}
