use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use exchange_engine::{
    dispatch::{Dispatcher, DispatcherConfig},
    errors::error::prelude::*,
    formats::{hlindy::HyperledgerIndyFormat, ld_proof::LdProofFormat, FormatRegistry},
    transport::{OutboundSender, RoutingContext},
};
use messages::{decorators::service::ServiceDecorator, ExchangeMessage};
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

/// Transport capturing everything the dispatcher sends, so tests can inspect
/// routing and pump messages into the counterparty agent.
struct ChannelTransport {
    sender: mpsc::UnboundedSender<(ExchangeMessage, RoutingContext)>,
}

#[async_trait]
impl OutboundSender for ChannelTransport {
    async fn send(&self, message: ExchangeMessage, routing: RoutingContext) -> EngineResult<()> {
        self.sender.send((message, routing)).map_err(|err| {
            EngineError::from_msg(EngineErrorKind::PostMessageFailed, err.to_string())
        })
    }
}

pub struct TestAgent {
    pub dispatcher: Dispatcher,
    outbox: mpsc::UnboundedReceiver<(ExchangeMessage, RoutingContext)>,
}

impl TestAgent {
    pub fn new(formats: FormatRegistry, config: DispatcherConfig) -> Self {
        let (sender, outbox) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(formats, Arc::new(ChannelTransport { sender }), config);
        Self { dispatcher, outbox }
    }

    /// The next message this agent sent, panicking when there is none.
    pub fn next_outbound(&mut self) -> (ExchangeMessage, RoutingContext) {
        self.outbox
            .try_recv()
            .expect("agent should have sent a message")
    }

    pub fn no_outbound(&mut self) {
        assert!(self.outbox.try_recv().is_err(), "agent sent an unexpected message");
    }

    /// Pump this agent's next outbound message into `other`, returning the
    /// routing it was sent with.
    pub async fn deliver_to(
        &mut self,
        other: &TestAgent,
        connection_id: Option<String>,
    ) -> RoutingContext {
        let (message, routing) = self.next_outbound();
        other
            .dispatcher
            .handle_inbound(to_wire(&message), connection_id)
            .await
            .unwrap();
        routing
    }
}

pub fn to_wire(message: &ExchangeMessage) -> Value {
    serde_json::to_value(message).unwrap()
}

/// Registry with the Indy style plugin holding the given attribute values,
/// plus the linked data proof plugin.
pub fn test_formats(values: &[(&str, Value)]) -> FormatRegistry {
    let values: HashMap<String, Value> = values
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect();
    FormatRegistry::new()
        .register(Arc::new(HyperledgerIndyFormat::with_credential_values(values)))
        .register(Arc::new(LdProofFormat))
}

pub fn make_service(recipient_key: &str) -> ServiceDecorator {
    ServiceDecorator::builder()
        .recipient_keys(vec![recipient_key.to_owned()])
        .service_endpoint(Url::parse("https://dummy.dummy/dummy").unwrap())
        .build()
}
