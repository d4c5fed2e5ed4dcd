//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentLinkStore` - single-use link persistence (atomic redemption)
//! - `LedgerWriter` / `LedgerReader` - payment ledger and subscription state
//! - `CheckoutBridge` - the external payment processor

mod checkout_bridge;
mod ledger;
mod link_store;

pub use checkout_bridge::{
    BridgeError, BridgeSubscription, CheckoutBridge, CheckoutMode, CheckoutSession,
    CreateCheckoutSessionRequest, PaymentIntent, PortalSession,
};
pub use ledger::{
    LedgerReader, LedgerWriter, RecordOutcome, SubscriptionPatch, SubscriptionUpdateOutcome,
};
pub use link_store::PaymentLinkStore;
