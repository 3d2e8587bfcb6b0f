use exchange_engine::{
    autoaccept::AutoAcceptPolicy,
    dispatch::DispatcherConfig,
    protocols::issuance::{CredentialOfferData, CredentialProposalData},
    records::{CredentialRole, CredentialState, ProtocolVersion},
};

use crate::utils::{
    credential_attributes, drain_events, init_logger, last_credential_record,
    test_agent::{test_formats, TestAgent},
};

pub mod utils;

fn agent(policy: AutoAcceptPolicy) -> TestAgent {
    TestAgent::new(
        test_formats(&[]),
        DispatcherConfig::builder()
            .auto_accept_credentials(policy)
            .build(),
    )
}

#[tokio::test]
async fn test_offer_driven_issuance_with_auto_accept() {
    init_logger();
    let mut issuer = agent(AutoAcceptPolicy::Always);
    let mut holder = agent(AutoAcceptPolicy::Always);
    let mut holder_events = holder.dispatcher.subscribe();

    let data = CredentialOfferData::builder()
        .attributes(credential_attributes())
        .build();
    let (_, issuer_record) = issuer
        .dispatcher
        .offer_credential(ProtocolVersion::V1, Some("conn-holder".to_owned()), data)
        .await
        .unwrap();
    assert_eq!(issuer_record.state, CredentialState::OfferSent);

    // offer -> request -> credential -> ack, each reply fired automatically
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;
    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;
    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;

    let issuer_record = issuer
        .dispatcher
        .credential_record(&issuer_record.id)
        .await
        .unwrap();
    assert_eq!(issuer_record.state, CredentialState::Done);

    let events = drain_events(&mut holder_events);
    let holder_record = last_credential_record(&events).unwrap();
    assert_eq!(holder_record.role, CredentialRole::Holder);
    assert_eq!(holder_record.state, CredentialState::Done);
    assert_eq!(holder_record.thread_id, issuer_record.thread_id);

    let states: Vec<CredentialState> = events
        .iter()
        .filter_map(|e| match e {
            exchange_engine::events::ExchangeEvent::Credential(c) => Some(c.record.state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            CredentialState::OfferReceived,
            CredentialState::RequestSent,
            CredentialState::CredentialReceived,
            CredentialState::Done,
        ]
    );
}

#[tokio::test]
async fn test_proposal_driven_issuance_with_content_approval() {
    init_logger();
    // The issuer answers any proposal; the holder only follows through while
    // the issuer's messages match what it proposed.
    let mut issuer = agent(AutoAcceptPolicy::Always);
    let mut holder = agent(AutoAcceptPolicy::ContentApproved);
    let mut issuer_events = issuer.dispatcher.subscribe();

    let data = CredentialProposalData::builder()
        .attributes(credential_attributes())
        .build();
    let (_, holder_record) = holder
        .dispatcher
        .propose_credential(ProtocolVersion::V2, Some("conn-issuer".to_owned()), data)
        .await
        .unwrap();
    assert_eq!(holder_record.state, CredentialState::ProposalSent);

    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;
    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;
    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;

    let holder_record = holder
        .dispatcher
        .credential_record(&holder_record.id)
        .await
        .unwrap();
    assert_eq!(holder_record.state, CredentialState::Done);

    let issuer_record = last_credential_record(&drain_events(&mut issuer_events)).unwrap();
    assert_eq!(issuer_record.role, CredentialRole::Issuer);
    assert_eq!(issuer_record.state, CredentialState::Done);
}

#[tokio::test]
async fn test_never_policy_waits_for_the_caller() {
    init_logger();
    let mut issuer = agent(AutoAcceptPolicy::Never);
    let mut holder = agent(AutoAcceptPolicy::Never);
    let mut holder_events = holder.dispatcher.subscribe();

    let data = CredentialOfferData::builder()
        .attributes(credential_attributes())
        .build();
    let (_, _) = issuer
        .dispatcher
        .offer_credential(ProtocolVersion::V1, Some("conn-holder".to_owned()), data)
        .await
        .unwrap();
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;

    // No automatic reply; the exchange sits in OfferReceived until accepted.
    holder.no_outbound();
    let holder_record = last_credential_record(&drain_events(&mut holder_events)).unwrap();
    assert_eq!(holder_record.state, CredentialState::OfferReceived);

    let holder_record = holder
        .dispatcher
        .accept_credential_offer(&holder_record.id)
        .await
        .unwrap();
    assert_eq!(holder_record.state, CredentialState::RequestSent);
    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;
}

#[tokio::test]
async fn test_decline_sends_a_problem_report() {
    init_logger();
    let mut issuer = agent(AutoAcceptPolicy::Never);
    let mut holder = agent(AutoAcceptPolicy::Never);
    let mut holder_events = holder.dispatcher.subscribe();
    let mut issuer_events = issuer.dispatcher.subscribe();

    let data = CredentialOfferData::builder()
        .attributes(credential_attributes())
        .build();
    issuer
        .dispatcher
        .offer_credential(ProtocolVersion::V1, Some("conn-holder".to_owned()), data)
        .await
        .unwrap();
    issuer.deliver_to(&holder, Some("conn-issuer".to_owned())).await;

    let holder_record = last_credential_record(&drain_events(&mut holder_events)).unwrap();
    let holder_record = holder
        .dispatcher
        .decline_credential(&holder_record.id, Some("not interested".to_owned()))
        .await
        .unwrap();
    assert_eq!(holder_record.state, CredentialState::Declined);

    holder.deliver_to(&issuer, Some("conn-holder".to_owned())).await;
    let issuer_record = last_credential_record(&drain_events(&mut issuer_events)).unwrap();
    assert_eq!(issuer_record.state, CredentialState::Declined);
    assert_eq!(issuer_record.error_message.as_deref(), Some("not interested"));
}
