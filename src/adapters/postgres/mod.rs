//! PostgreSQL adapters for the persistence ports.

mod ledger;
mod link_store;

pub use ledger::PostgresLedger;
pub use link_store::PostgresPaymentLinkStore;
