//! Paydesk - Sales Payment Backend
//!
//! Issues single-use payment links, bridges them to Stripe, and reconciles
//! webhook-driven state changes for one-time payments and subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
