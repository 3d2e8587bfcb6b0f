//! Outbound transport seam. The engine hands fully built messages to an
//! [`OutboundSender`]; delivery, encryption and routing live outside.

use async_trait::async_trait;
use messages::{decorators::service::ServiceDecorator, ExchangeMessage};

use crate::errors::error::prelude::*;

/// Where a message should be delivered.
#[derive(Clone, Debug)]
pub enum RoutingContext {
    Connection {
        connection_id: String,
    },
    /// Connection-less delivery to the counterparty's `~service` block.
    /// `sender_key` is our own key, taken from the `~service` decorator of
    /// the message we previously sent on the thread.
    Service {
        service: ServiceDecorator,
        sender_key: Option<String>,
    },
}

#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(&self, message: ExchangeMessage, routing: RoutingContext) -> EngineResult<()>;
}
