//! Lifecycle events, published after every durable record transition.

use tokio::sync::broadcast;

use crate::records::{
    CredentialExchangeRecord, CredentialState, ProofExchangeRecord, ProofState,
};

#[derive(Clone, Debug)]
pub struct CredentialStateChanged {
    /// `None` when the transition created the record.
    pub previous_state: Option<CredentialState>,
    pub record: CredentialExchangeRecord,
}

#[derive(Clone, Debug)]
pub struct ProofStateChanged {
    pub previous_state: Option<ProofState>,
    pub record: ProofExchangeRecord,
}

#[derive(Clone, Debug)]
pub enum ExchangeEvent {
    Credential(CredentialStateChanged),
    Proof(ProofStateChanged),
}

/// Fire-and-forget event fan-out. The channel is bounded; subscribers that
/// lag drop events, the publisher never blocks on them.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExchangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ExchangeEvent) {
        // A send error only means nobody is listening right now.
        if let Err(err) = self.sender.send(event) {
            log::trace!("dropping event, no subscribers: {err}");
        }
    }

    pub fn publish_credential(
        &self,
        previous_state: Option<CredentialState>,
        record: CredentialExchangeRecord,
    ) {
        self.publish(ExchangeEvent::Credential(CredentialStateChanged {
            previous_state,
            record,
        }));
    }

    pub fn publish_proof(&self, previous_state: Option<ProofState>, record: ProofExchangeRecord) {
        self.publish(ExchangeEvent::Proof(ProofStateChanged {
            previous_state,
            record,
        }));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CredentialRole, ProtocolVersion};

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        let record = CredentialExchangeRecord::new(
            "thid".to_owned(),
            None,
            ProtocolVersion::V1,
            CredentialRole::Issuer,
            CredentialState::OfferSent,
            None,
        );
        bus.publish_credential(None, record.clone());

        let ExchangeEvent::Credential(event) = receiver.recv().await.unwrap() else {
            panic!("expected a credential event");
        };
        assert_eq!(event.previous_state, None);
        assert_eq!(event.record.state, CredentialState::OfferSent);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_block() {
        let bus = EventBus::new(1);
        let record = CredentialExchangeRecord::new(
            "thid".to_owned(),
            None,
            ProtocolVersion::V1,
            CredentialRole::Issuer,
            CredentialState::OfferSent,
            None,
        );
        bus.publish_credential(None, record);
    }
}
