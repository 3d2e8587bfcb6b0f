pub mod test_agent;

use exchange_engine::{
    events::ExchangeEvent,
    records::{CredentialExchangeRecord, ProofExchangeRecord},
};
use messages::msg_fields::cred_issuance::CredentialAttr;
use tokio::sync::broadcast;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn credential_attributes() -> Vec<CredentialAttr> {
    vec![
        CredentialAttr::builder()
            .name("name".to_owned())
            .value("John".to_owned())
            .build(),
        CredentialAttr::builder()
            .name("degree".to_owned())
            .value("maths".to_owned())
            .build(),
    ]
}

pub fn drain_events(receiver: &mut broadcast::Receiver<ExchangeEvent>) -> Vec<ExchangeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn last_credential_record(events: &[ExchangeEvent]) -> Option<CredentialExchangeRecord> {
    events
        .iter()
        .filter_map(|e| match e {
            ExchangeEvent::Credential(changed) => Some(changed.record.clone()),
            ExchangeEvent::Proof(_) => None,
        })
        .last()
}

pub fn last_proof_record(events: &[ExchangeEvent]) -> Option<ProofExchangeRecord> {
    events
        .iter()
        .filter_map(|e| match e {
            ExchangeEvent::Proof(changed) => Some(changed.record.clone()),
            ExchangeEvent::Credential(_) => None,
        })
        .last()
}
