//! Axum router configuration for the payment API.
//!
//! Route groups map to the public operation surface. Authentication and
//! role guards for the sales/admin groups are applied by the excluded auth
//! subsystem when it mounts this router; the webhook group authenticates
//! via signature instead.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, create_portal, create_subscription, issue_link, list_links,
    list_payments, list_subscriptions, payment_status, receive_webhook, redeem_link, renew_link,
    subscription_status, AppState,
};

/// Sales-facing link management.
///
/// - `POST /payment-links` - Issue a payment link
/// - `POST /payment-links/renew` - Replace a link's token and expiry
pub fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/payment-links", post(issue_link))
        .route("/payment-links/renew", post(renew_link))
}

/// Customer-facing checkout operations.
///
/// - `POST /redeem` - Redeem a link and initiate a one-time payment
/// - `POST /subscriptions` - Start a subscription checkout flow
/// - `POST /subscriptions/cancel` - Cancel at period end
/// - `POST /portal` - Create a billing portal session
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/redeem", post(redeem_link))
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions/cancel", post(cancel_subscription))
        .route("/portal", post(create_portal))
}

/// Read-only funnel and access queries.
///
/// - `GET /payment?email=` - Payment funnel position
/// - `GET /subscription?email=` - Paid access check
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/payment", get(payment_status))
        .route("/subscription", get(subscription_status))
}

/// Provider webhook delivery.
///
/// Separate from the other groups because webhooks carry no user
/// authentication; they are verified via signature.
///
/// - `POST /stripe` - Receive provider webhook events
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(receive_webhook))
}

/// Admin listing endpoints.
///
/// - `GET /payments` - List all ledger rows
/// - `GET /payment-links` - List all payment links
/// - `GET /subscriptions` - List all subscription rows
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payment-links", get(list_links))
        .route("/subscriptions", get(list_subscriptions))
}

/// The complete payment API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/sales", sales_routes())
        .nest("/checkout", checkout_routes())
        .nest("/status", status_routes())
        .nest("/webhooks", webhook_routes())
        .nest("/admin", admin_routes())
}
