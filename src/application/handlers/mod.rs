//! Payment handlers.
//!
//! Command and query handlers for the public operation surface:
//!
//! ## Commands
//! - Issuing and renewing payment links
//! - Redeeming a link and initiating a one-time payment
//! - Starting a subscription checkout flow
//! - Cancelling a subscription at period end
//! - Creating a billing portal session
//! - Processing provider webhooks
//!
//! ## Queries
//! - Payment funnel status per identity
//! - Subscription access check per identity

mod cancel_subscription;
mod create_portal_session;
mod create_subscription_session;
mod get_payment_status;
mod get_subscription_status;
mod handle_webhook;
mod issue_link;
mod redeem_link;
mod renew_link;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use create_portal_session::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, CreatePortalSessionResult,
};
pub use create_subscription_session::{
    CreateSubscriptionSessionCommand, CreateSubscriptionSessionHandler,
    CreateSubscriptionSessionResult,
};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler};
pub use issue_link::{IssueLinkCommand, IssueLinkHandler, IssueLinkResult};
pub use redeem_link::{RedeemLinkCommand, RedeemLinkHandler, RedeemLinkResult};
pub use renew_link::{RenewLinkCommand, RenewLinkHandler, RenewLinkResult};

// Queries
pub use get_payment_status::{
    FunnelStatus, GetPaymentStatusHandler, GetPaymentStatusQuery, GetPaymentStatusResult,
};
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
