pub mod order;
pub mod transaction;

pub use order::{Order, OrderStatus};
pub use transaction::{NewTransaction, Transaction, TransactionStatus, TransactionUpdate};
