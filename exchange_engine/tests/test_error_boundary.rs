use exchange_engine::{
    autoaccept::AutoAcceptPolicy,
    dispatch::DispatcherConfig,
    protocols::issuance::CredentialOfferData,
    records::{CredentialState, ProtocolVersion},
    utils::attachment::make_attachment,
};
use messages::{
    decorators::thread::Thread,
    msg_fields::cred_issuance::v1::issue_credential::{
        IssueCredentialV1, IssueCredentialV1Content, IssueCredentialV1Decorators,
    },
    ExchangeMessage,
};
use serde_json::json;

use crate::utils::{
    credential_attributes, drain_events, init_logger, last_credential_record,
    test_agent::{test_formats, to_wire, TestAgent},
};

pub mod utils;

fn agent() -> TestAgent {
    TestAgent::new(
        test_formats(&[]),
        DispatcherConfig::builder()
            .auto_accept_credentials(AutoAcceptPolicy::Never)
            .build(),
    )
}

fn premature_credential(thread_id: &str) -> ExchangeMessage {
    let content = IssueCredentialV1Content::builder()
        .credentials_attach(vec![make_attachment(
            &json!({ "values": { "name": "Mallory" } }),
            "libindy-cred-0".to_owned(),
        )
        .unwrap()])
        .build();
    let decorators = IssueCredentialV1Decorators::builder()
        .thread(Thread::builder().thid(thread_id.to_owned()).build())
        .build();
    IssueCredentialV1::builder()
        .id("premature".to_owned())
        .content(content)
        .decorators(decorators)
        .build()
        .into()
}

#[tokio::test]
async fn test_illegal_step_abandons_only_its_own_thread() {
    init_logger();
    let mut issuer = agent();
    let mut holder = agent();
    let mut holder_events = holder.dispatcher.subscribe();

    let data = CredentialOfferData::builder()
        .attributes(credential_attributes())
        .build();
    let (_, issuer_record) = issuer
        .dispatcher
        .offer_credential(ProtocolVersion::V1, Some("conn-holder".to_owned()), data)
        .await
        .unwrap();
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;

    let offered = last_credential_record(&drain_events(&mut holder_events)).unwrap();
    assert_eq!(offered.state, CredentialState::OfferReceived);

    // A credential before any request is an illegal step. handle_inbound
    // reports success; the failure is contained in the record.
    holder
        .dispatcher
        .handle_inbound(
            to_wire(&premature_credential(&issuer_record.thread_id)),
            Some("conn-issuer".to_owned()),
        )
        .await
        .unwrap();
    holder.no_outbound();

    let abandoned = holder
        .dispatcher
        .credential_record(&offered.id)
        .await
        .unwrap();
    assert_eq!(abandoned.state, CredentialState::Abandoned);
    assert!(abandoned.error_message.is_some());

    // A fresh exchange on another thread is unaffected.
    let data = CredentialOfferData::builder()
        .attributes(credential_attributes())
        .build();
    issuer
        .dispatcher
        .offer_credential(ProtocolVersion::V1, Some("conn-holder".to_owned()), data)
        .await
        .unwrap();
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;

    let fresh = last_credential_record(&drain_events(&mut holder_events)).unwrap();
    assert_eq!(fresh.state, CredentialState::OfferReceived);
    let fresh = holder
        .dispatcher
        .accept_credential_offer(&fresh.id)
        .await
        .unwrap();
    assert_eq!(fresh.state, CredentialState::RequestSent);

    // The abandoned record stays terminal.
    let err = holder
        .dispatcher
        .accept_credential_offer(&abandoned.id)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind(),
        exchange_engine::errors::error::EngineErrorKind::StateTransition
    );
}
