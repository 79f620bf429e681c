//! Messaging Adapters
//!
//! Implementations of the dispatch queue port.

pub mod channel;
pub mod nats;

pub use channel::{ChannelOrderQueue, FlakyOrderQueue};
pub use nats::NatsOrderQueue;
