//! HTTP adapter - axum routing, handlers, and DTOs for the payment API.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AppState, PaymentSettings};
pub use routes::api_router;
