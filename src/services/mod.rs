pub mod checkout;
pub mod nonce;
pub mod reconciler;
pub mod retention;

pub use checkout::{CheckoutOutcome, CheckoutService};
pub use nonce::{NonceError, NonceService, ADMIN_NONCE_ACTION};
pub use reconciler::{CallbackParams, ReconcileError, Reconciler, Reconciliation};
pub use retention::prune_transaction_logs;
