//! Ledger domain - append-only payments and reconciled subscription state.

mod payment;
mod subscription;

pub use payment::{NewPayment, PaymentKind, PaymentRecord, PaymentStatus, ProviderRefs};
pub use subscription::{
    SubscriptionRecord, SubscriptionState, STATUS_ACTIVE, STATUS_CANCELED,
};
