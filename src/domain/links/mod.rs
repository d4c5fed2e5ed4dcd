//! Payment link domain - single-use tokens gating checkout initiation.

mod link;

pub use link::{generate_token, IssuedLink, LinkStatus, PaymentLink, TOKEN_BYTES};
