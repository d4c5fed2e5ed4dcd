//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - persistent stores backed by PostgreSQL
//! - `stripe` - Checkout Bridge against the Stripe API, plus a mock
//! - `memory` - in-memory stores for tests and offline development
//! - `http` - axum routing, handlers, and DTOs

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
