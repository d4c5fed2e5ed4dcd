//! Stripe adapters for the Checkout Bridge port.

mod bridge;
mod mock;

pub use bridge::{StripeCheckoutBridge, StripeConfig};
pub use mock::MockCheckoutBridge;
