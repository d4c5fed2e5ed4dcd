//! Webhook domain - verification, classification, and reconciliation of
//! provider events.

mod dispatcher;
mod errors;
mod event;
mod verifier;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use errors::WebhookError;
pub use event::{
    CheckoutSessionObject, CustomerDetails, EventKind, InvoiceLine, InvoiceLines, InvoiceObject,
    InvoicePeriod, PaymentIntentObject, ProviderEvent, ProviderEventData, SubscriptionObject,
};
pub use verifier::{SignatureHeader, WebhookVerifier};
