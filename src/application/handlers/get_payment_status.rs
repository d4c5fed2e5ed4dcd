//! GetPaymentStatusHandler - Query handler for the payment funnel view.
//!
//! One endpoint answers "where is this identity in the funnel": the most
//! recent ledger row if a payment exists, otherwise the state of the
//! identity's payment link.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::ledger::{PaymentKind, PaymentStatus};
use crate::domain::links::LinkStatus;
use crate::ports::{LedgerReader, PaymentLinkStore};

/// Query for an identity's payment funnel position.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub email: String,
}

/// Where an identity currently sits in the payment funnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelStatus {
    /// A payment row exists; its status is authoritative.
    Payment {
        status: PaymentStatus,
        kind: PaymentKind,
    },
    /// No payment and no link for this identity.
    LinkNotFound,
    /// An active link exists, awaiting the customer.
    AwaitingPayment,
    /// The link was redeemed but no settlement event has arrived yet.
    AwaitingConfirmation,
    /// The link expired unused.
    LinkExpired,
}

/// Result of the funnel query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPaymentStatusResult {
    pub status: FunnelStatus,
}

/// Handler for the payment funnel query. Pure read, no side effects.
pub struct GetPaymentStatusHandler {
    reader: Arc<dyn LedgerReader>,
    links: Arc<dyn PaymentLinkStore>,
}

impl GetPaymentStatusHandler {
    pub fn new(reader: Arc<dyn LedgerReader>, links: Arc<dyn PaymentLinkStore>) -> Self {
        Self { reader, links }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<GetPaymentStatusResult, DomainError> {
        let email = EmailAddress::new(&query.email)?;

        if let Some(payment) = self.reader.latest_payment(&email).await? {
            return Ok(GetPaymentStatusResult {
                status: FunnelStatus::Payment {
                    status: payment.status,
                    kind: payment.kind,
                },
            });
        }

        let status = match self.links.find_by_email(&email).await? {
            None => FunnelStatus::LinkNotFound,
            Some(link) => match link.status(Utc::now()) {
                LinkStatus::Active => FunnelStatus::AwaitingPayment,
                LinkStatus::Used => FunnelStatus::AwaitingConfirmation,
                LinkStatus::Expired | LinkStatus::Superseded => FunnelStatus::LinkExpired,
            },
        };

        Ok(GetPaymentStatusResult { status })
    }
}
