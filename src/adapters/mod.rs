//! Adapters implementing the ports.

pub mod memory_order_store;
pub mod memory_transaction_log;
pub mod postgres_order_store;
pub mod postgres_transaction_log;

pub use memory_order_store::{MemoryOrderStore, OrderRecord};
pub use memory_transaction_log::MemoryTransactionLog;
pub use postgres_order_store::PostgresOrderStore;
pub use postgres_transaction_log::PostgresTransactionLog;
