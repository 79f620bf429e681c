//! NATS dispatch queue.
//!
//! Publishes each order as JSON on one subject and flushes before
//! returning, so a successful publish means the server has the message.
//! The order id travels in the `Nats-Msg-Id` header; a JetStream stream
//! on the subject uses it to drop relay duplicates.

use std::time::Duration;

use async_nats::{Client, HeaderMap};
use async_trait::async_trait;

use crate::application::dto::OrderDispatchMessage;
use crate::application::ports::{OrderQueuePort, QueueError};
use crate::domain::order_management::Order;

/// Dispatch queue on a NATS subject.
#[derive(Debug, Clone)]
pub struct NatsOrderQueue {
    client: Client,
    subject: String,
    publish_timeout: Duration,
}

impl NatsOrderQueue {
    /// Connect to `url` and publish on `subject`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the server cannot be reached.
    pub async fn connect(
        url: &str,
        subject: impl Into<String>,
        publish_timeout: Duration,
    ) -> Result<Self, QueueError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| QueueError::Unavailable(format!("connect {url}: {e}")))?;
        let subject = subject.into();

        tracing::info!(url, subject = %subject, "Connected to NATS dispatch queue");

        Ok(Self {
            client,
            subject,
            publish_timeout,
        })
    }
}

pub(crate) fn encode(order: &Order) -> Result<Vec<u8>, QueueError> {
    serde_json::to_vec(&OrderDispatchMessage::from(order))
        .map_err(|e| QueueError::Encoding(e.to_string()))
}

#[async_trait]
impl OrderQueuePort for NatsOrderQueue {
    async fn publish(&self, order: &Order) -> Result<(), QueueError> {
        let payload = encode(order)?;
        let mut headers = HeaderMap::new();
        headers.insert("Nats-Msg-Id", order.id().as_str());

        let send = async {
            self.client
                .publish_with_headers(self.subject.clone(), headers, payload.into())
                .await
                .map_err(|e| QueueError::Unavailable(e.to_string()))?;
            self.client
                .flush()
                .await
                .map_err(|e| QueueError::Unavailable(e.to_string()))
        };

        tokio::time::timeout(self.publish_timeout, send)
            .await
            .map_err(|_| QueueError::Unavailable("publish timed out".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::{NewOrder, OrderSide};
    use crate::domain::shared::{AccountId, Amount, InstrumentId, OrderId, Timestamp};

    #[test]
    fn payload_carries_decimal_strings_and_wire_type() {
        let draft = NewOrder::new(
            AccountId::new("A1"),
            InstrumentId::new("I1"),
            OrderSide::Sell,
            Amount::parse("0.1").unwrap(),
            Amount::parse("3").unwrap(),
        )
        .unwrap();
        let order = Order::from_new(OrderId::new("o-1"), draft, Timestamp::now());

        let json: serde_json::Value = serde_json::from_slice(&encode(&order).unwrap()).unwrap();
        assert_eq!(json["id"], "o-1");
        assert_eq!(json["type"], "SELL");
        assert_eq!(json["price"], "0.1");
        assert_eq!(json["remaining_quantity"], "3");
        assert_eq!(json["status"], "OPEN");
    }
}
