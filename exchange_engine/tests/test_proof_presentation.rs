use exchange_engine::{
    autoaccept::AutoAcceptPolicy,
    dispatch::DispatcherConfig,
    protocols::presentation::PresentationRequestData,
    records::{ProofRole, ProofState, ProtocolVersion},
    transport::RoutingContext,
};
use serde_json::{json, Value};

use crate::utils::{
    drain_events, init_logger, last_proof_record,
    test_agent::{make_service, test_formats, to_wire, TestAgent},
};

pub mod utils;

fn verifier_agent(policy: AutoAcceptPolicy) -> TestAgent {
    TestAgent::new(
        test_formats(&[]),
        DispatcherConfig::builder()
            .auto_accept_proofs(policy)
            .service(Some(make_service("verifier-key-1")))
            .build(),
    )
}

fn prover_agent(policy: AutoAcceptPolicy, values: &[(&str, Value)]) -> TestAgent {
    TestAgent::new(
        test_formats(values),
        DispatcherConfig::builder()
            .auto_accept_proofs(policy)
            .service(Some(make_service("prover-key-1")))
            .build(),
    )
}

fn request_data() -> PresentationRequestData {
    PresentationRequestData::builder()
        .name("employment-check".to_owned())
        .requested_attributes(json!({
            "attribute_0": {
                "name": "name",
                "restrictions": [{ "cred_def_id": "V4SG:3:CL:1:tag" }]
            }
        }))
        .requested_predicates(json!({
            "predicate_0": { "name": "age", "p_type": ">=", "p_value": 50 }
        }))
        .build()
}

#[tokio::test]
async fn test_connectionless_proof_with_predicate() {
    init_logger();
    let mut verifier = verifier_agent(AutoAcceptPolicy::ContentApproved);
    let mut prover = prover_agent(
        AutoAcceptPolicy::Always,
        &[("name", json!("John")), ("age", json!(99))],
    );
    let mut prover_events = prover.dispatcher.subscribe();

    // No connection; the request is returned for out-of-band delivery and
    // carries the verifier's ~service block.
    let (request, verifier_record) = verifier
        .dispatcher
        .request_presentation(ProtocolVersion::V1, None, request_data())
        .await
        .unwrap();
    verifier.no_outbound();

    prover
        .dispatcher
        .handle_inbound(to_wire(&request), None)
        .await
        .unwrap();

    // The prover answered immediately, addressed to the verifier's service.
    let (presentation, routing) = prover.next_outbound();
    let RoutingContext::Service {
        service,
        sender_key,
    } = routing
    else {
        panic!("expected connection-less routing");
    };
    assert_eq!(service.recipient_keys, vec!["verifier-key-1".to_owned()]);
    assert_eq!(sender_key.as_deref(), Some("prover-key-1"));

    verifier
        .dispatcher
        .handle_inbound(to_wire(&presentation), None)
        .await
        .unwrap();

    let verifier_record = verifier
        .dispatcher
        .proof_record(&verifier_record.id)
        .await
        .unwrap();
    assert_eq!(verifier_record.is_verified, Some(true));
    assert_eq!(verifier_record.state, ProofState::Done);

    // The automatic ack goes back to the prover's service.
    let (ack, routing) = verifier.next_outbound();
    let RoutingContext::Service { service, .. } = routing else {
        panic!("expected connection-less routing");
    };
    assert_eq!(service.recipient_keys, vec!["prover-key-1".to_owned()]);

    prover
        .dispatcher
        .handle_inbound(to_wire(&ack), None)
        .await
        .unwrap();
    let prover_record = last_proof_record(&drain_events(&mut prover_events)).unwrap();
    assert_eq!(prover_record.role, ProofRole::Prover);
    assert_eq!(prover_record.state, ProofState::Done);
}

#[tokio::test]
async fn test_unsatisfied_predicate_is_not_acknowledged() {
    init_logger();
    let mut verifier = verifier_agent(AutoAcceptPolicy::ContentApproved);
    let mut prover = prover_agent(
        AutoAcceptPolicy::Always,
        &[("name", json!("John")), ("age", json!(30))],
    );

    let (request, verifier_record) = verifier
        .dispatcher
        .request_presentation(ProtocolVersion::V1, None, request_data())
        .await
        .unwrap();
    prover
        .dispatcher
        .handle_inbound(to_wire(&request), None)
        .await
        .unwrap();
    prover.deliver_to(&verifier, None).await;

    // The presentation was recorded but failed verification; content
    // approval withholds the ack.
    verifier.no_outbound();
    let verifier_record = verifier
        .dispatcher
        .proof_record(&verifier_record.id)
        .await
        .unwrap();
    assert_eq!(verifier_record.state, ProofState::PresentationReceived);
    assert_eq!(verifier_record.is_verified, Some(false));

    let verifier_record = verifier
        .dispatcher
        .decline_presentation(&verifier_record.id, Some("predicate not met".to_owned()))
        .await
        .unwrap();
    assert_eq!(verifier_record.state, ProofState::Declined);
    verifier.next_outbound();
}

#[tokio::test]
async fn test_v2_proof_over_a_connection() {
    init_logger();
    let mut verifier = verifier_agent(AutoAcceptPolicy::Always);
    let mut prover = prover_agent(
        AutoAcceptPolicy::Always,
        &[("name", json!("John")), ("age", json!(99))],
    );

    let (_, verifier_record) = verifier
        .dispatcher
        .request_presentation(
            ProtocolVersion::V2,
            Some("conn-prover".to_owned()),
            request_data(),
        )
        .await
        .unwrap();

    verifier.deliver_to(&prover, Some("conn-verifier".to_owned())).await;
    prover.deliver_to(&verifier, Some("conn-prover".to_owned())).await;
    verifier.deliver_to(&prover, Some("conn-verifier".to_owned())).await;

    let verifier_record = verifier
        .dispatcher
        .proof_record(&verifier_record.id)
        .await
        .unwrap();
    assert_eq!(verifier_record.is_verified, Some(true));
    assert_eq!(verifier_record.state, ProofState::Done);
}
