//! HTTP handlers for the payment API.
//!
//! These handlers connect axum routes to application layer command/query
//! handlers. Authentication and role guards for the sales/admin routes live
//! in the excluded auth subsystem; the webhook route authenticates itself
//! via signature verification.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::application::handlers::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CreatePortalSessionCommand,
    CreatePortalSessionHandler, CreateSubscriptionSessionCommand,
    CreateSubscriptionSessionHandler, GetPaymentStatusHandler, GetPaymentStatusQuery,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, HandleWebhookCommand,
    HandleWebhookHandler, IssueLinkCommand, IssueLinkHandler, RedeemLinkCommand,
    RedeemLinkHandler, RenewLinkCommand, RenewLinkHandler,
};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{CheckoutBridge, LedgerReader, PaymentLinkStore};

use super::dto::{
    CancelResponse, CancelSubscriptionRequest, CheckoutResponse, CreatePortalRequest,
    CreateSubscriptionRequest, ErrorResponse, IssueLinkRequest, LinkResponse, LinkView,
    PaymentStatusResponse, PaymentView, PortalResponse, RedeemLinkRequest, RedeemResponse,
    RenewLinkRequest, StatusQuery, SubscriptionStatusResponse, SubscriptionView,
};

// ════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════

/// Pricing and link-building settings shared by the handlers.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Base URL the issued payment links point at.
    pub frontend_base_url: String,
    /// One-time payment amount in minor currency units.
    pub one_time_amount_minor: i64,
    /// Currency for one-time payments.
    pub currency: String,
    /// Provider price id for the subscription plan.
    pub subscription_price_id: String,
}

/// Shared application state containing all dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<dyn PaymentLinkStore>,
    pub ledger_reader: Arc<dyn LedgerReader>,
    pub bridge: Arc<dyn CheckoutBridge>,
    pub webhook: Arc<HandleWebhookHandler>,
    pub settings: PaymentSettings,
}

impl AppState {
    /// Create handlers on demand from the shared state.
    pub fn issue_link_handler(&self) -> IssueLinkHandler {
        IssueLinkHandler::new(self.links.clone(), self.settings.frontend_base_url.clone())
    }

    pub fn renew_link_handler(&self) -> RenewLinkHandler {
        RenewLinkHandler::new(self.links.clone(), self.settings.frontend_base_url.clone())
    }

    pub fn redeem_link_handler(&self) -> RedeemLinkHandler {
        RedeemLinkHandler::new(
            self.links.clone(),
            self.bridge.clone(),
            self.settings.one_time_amount_minor,
            self.settings.currency.clone(),
        )
    }

    pub fn create_subscription_session_handler(&self) -> CreateSubscriptionSessionHandler {
        CreateSubscriptionSessionHandler::new(
            self.bridge.clone(),
            self.settings.subscription_price_id.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.ledger_reader.clone(), self.bridge.clone())
    }

    pub fn create_portal_session_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(self.ledger_reader.clone(), self.bridge.clone())
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.ledger_reader.clone(), self.links.clone())
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.ledger_reader.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sales Endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /sales/payment-links - Issue a payment link
pub async fn issue_link(
    State(state): State<AppState>,
    Json(request): Json<IssueLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .issue_link_handler()
        .handle(IssueLinkCommand {
            email: request.email,
        })
        .await?;

    let response = LinkResponse {
        link: result.link_url,
        expires_at: result.expires_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /sales/payment-links/renew - Replace a link's token and expiry
pub async fn renew_link(
    State(state): State<AppState>,
    Json(request): Json<RenewLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .renew_link_handler()
        .handle(RenewLinkCommand {
            token: request.token,
        })
        .await?;

    let response = LinkResponse {
        link: result.link_url,
        expires_at: result.expires_at,
    };
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════
// Checkout Endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /checkout/redeem - Redeem a link and initiate a one-time payment
pub async fn redeem_link(
    State(state): State<AppState>,
    Json(request): Json<RedeemLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .redeem_link_handler()
        .handle(RedeemLinkCommand {
            token: request.token,
        })
        .await?;

    let response = RedeemResponse {
        client_secret: result.client_secret,
        payment_intent_id: result.payment_intent_id,
        amount: result.amount_minor,
        currency: result.currency,
    };
    Ok(Json(response))
}

/// POST /checkout/subscriptions - Start a subscription checkout flow
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .create_subscription_session_handler()
        .handle(CreateSubscriptionSessionCommand {
            email: request.email,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        })
        .await?;

    let response = CheckoutResponse {
        checkout_url: result.checkout_url,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /checkout/subscriptions/cancel - Cancel at period end
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand {
            email: request.email,
        })
        .await?;

    let response = CancelResponse {
        subscription_id: result.provider_subscription_id,
        cancel_at_period_end: result.cancel_at_period_end,
    };
    Ok(Json(response))
}

/// POST /checkout/portal - Create a billing portal session
pub async fn create_portal(
    State(state): State<AppState>,
    Json(request): Json<CreatePortalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .create_portal_session_handler()
        .handle(CreatePortalSessionCommand {
            email: request.email,
            return_url: request.return_url,
        })
        .await?;

    let response = PortalResponse {
        portal_url: result.portal_url,
    };
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════
// Status Endpoints
// ════════════════════════════════════════════════════════════════════════════

/// GET /status/payment?email= - Payment funnel position
pub async fn payment_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .payment_status_handler()
        .handle(GetPaymentStatusQuery { email: query.email })
        .await?;

    Ok(Json(PaymentStatusResponse::from(result.status)))
}

/// GET /status/subscription?email= - Paid access check
pub async fn subscription_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .subscription_status_handler()
        .handle(GetSubscriptionStatusQuery { email: query.email })
        .await?;

    Ok(Json(SubscriptionStatusResponse {
        active: result.has_active,
    }))
}

// ════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Receive provider webhook events
///
/// The body is consumed raw; signature verification needs the exact bytes
/// received. Per the provider contract the response is status-only.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return StatusCode::UNAUTHORIZED;
    };

    let cmd = HandleWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.webhook.handle(cmd).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, retryable = err.is_retryable(), "webhook rejected");
            err.status_code()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════

/// GET /admin/payments - List all ledger rows
pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let payments = state.ledger_reader.list_payments().await?;
    let views: Vec<PaymentView> = payments.into_iter().map(PaymentView::from).collect();
    Ok(Json(views))
}

/// GET /admin/payment-links - List all payment links
pub async fn list_links(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let links = state.links.list().await?;
    let views: Vec<LinkView> = links
        .into_iter()
        .map(|link| LinkView::at(link, now))
        .collect();
    Ok(Json(views))
}

/// GET /admin/subscriptions - List all subscription rows
pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriptions = state.ledger_reader.list_subscriptions().await?;
    let views: Vec<SubscriptionView> =
        subscriptions.into_iter().map(SubscriptionView::from).collect();
    Ok(Json(views))
}

// ════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::LinkNotFound | ErrorCode::SubscriptionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::LinkConflict => StatusCode::CONFLICT,
            ErrorCode::LinkInvalidOrExpired => StatusCode::GONE,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message.clone());
        (status, Json(body)).into_response()
    }
}
