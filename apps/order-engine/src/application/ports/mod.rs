//! Application Ports
//!
//! Driven ports the use cases depend on. Storage and reference lookups are
//! domain repository traits; the dispatch queue is defined here.

mod order_queue_port;

pub use crate::domain::order_management::OrderRepository;
pub use crate::domain::reference::{AccountRepository, BalanceRepository, InstrumentRepository};
pub use order_queue_port::{OrderQueuePort, QueueError};
