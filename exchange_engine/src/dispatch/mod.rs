//! Inbound message dispatch. [`Dispatcher`] is the single ingress for wire
//! messages and the surface callers drive exchanges through: it parses the
//! envelope, serializes processing per thread id, consults the auto-accept
//! coordinators and hands replies to the [`OutboundSender`].

use std::{collections::HashMap, sync::Arc};

use log::{debug, error};
use messages::{
    decorators::service::ServiceDecorator,
    msg_fields::{
        cred_issuance::{CredentialIssuance, v1::CredentialIssuanceV1, v2::CredentialIssuanceV2},
        present_proof::{PresentProof, v1::PresentProofV1, v2::PresentProofV2},
    },
    ExchangeMessage,
};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use typed_builder::TypedBuilder;

use crate::{
    autoaccept::{AutoAcceptPolicy, CredentialResponseCoordinator, ProofResponseCoordinator},
    errors::error::prelude::*,
    events::{EventBus, ExchangeEvent},
    formats::FormatRegistry,
    protocols::{
        issuance::{v1::IssuanceServiceV1, v2::IssuanceServiceV2, CredentialOfferData, CredentialProposalData},
        presentation::{v1::PresentationServiceV1, v2::PresentationServiceV2, PresentationRequestData},
    },
    records::{CredentialExchangeRecord, ProofExchangeRecord, ProtocolVersion},
    storage::{
        ExchangeMessageStore, ExchangeRecordStore, InMemoryRecordStore, RecordTags,
        StoredMessageKind,
    },
    transport::{OutboundSender, RoutingContext},
    utils::attachment::first_attachment_payload,
};

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct DispatcherConfig {
    /// Agent-wide default for credential exchanges, overridden per record.
    #[builder(default)]
    pub auto_accept_credentials: AutoAcceptPolicy,
    #[builder(default)]
    pub auto_accept_proofs: AutoAcceptPolicy,
    /// Our own `~service` block, attached to messages sent outside a
    /// connection so the counterparty can route replies back.
    #[builder(default)]
    pub service: Option<ServiceDecorator>,
}

pub struct Dispatcher {
    issuance_v1: IssuanceServiceV1,
    issuance_v2: IssuanceServiceV2,
    presentation_v1: PresentationServiceV1,
    presentation_v2: PresentationServiceV2,
    cred_records: Arc<dyn ExchangeRecordStore<CredentialExchangeRecord>>,
    proof_records: Arc<dyn ExchangeRecordStore<ProofExchangeRecord>>,
    messages: Arc<ExchangeMessageStore>,
    cred_coordinator: CredentialResponseCoordinator,
    proof_coordinator: ProofResponseCoordinator,
    events: EventBus,
    outbound: Arc<dyn OutboundSender>,
    our_service: Option<ServiceDecorator>,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(
        formats: FormatRegistry,
        outbound: Arc<dyn OutboundSender>,
        config: DispatcherConfig,
    ) -> Self {
        let cred_records: Arc<dyn ExchangeRecordStore<CredentialExchangeRecord>> =
            Arc::new(InMemoryRecordStore::new());
        let proof_records: Arc<dyn ExchangeRecordStore<ProofExchangeRecord>> =
            Arc::new(InMemoryRecordStore::new());
        let messages = Arc::new(ExchangeMessageStore::new());
        let formats = Arc::new(formats);
        let events = EventBus::default();

        Self {
            issuance_v1: IssuanceServiceV1::new(
                Arc::clone(&cred_records),
                Arc::clone(&messages),
                Arc::clone(&formats),
                events.clone(),
            ),
            issuance_v2: IssuanceServiceV2::new(
                Arc::clone(&cred_records),
                Arc::clone(&messages),
                Arc::clone(&formats),
                events.clone(),
            ),
            presentation_v1: PresentationServiceV1::new(
                Arc::clone(&proof_records),
                Arc::clone(&messages),
                Arc::clone(&formats),
                events.clone(),
            ),
            presentation_v2: PresentationServiceV2::new(
                Arc::clone(&proof_records),
                Arc::clone(&messages),
                Arc::clone(&formats),
                events.clone(),
            ),
            cred_records,
            proof_records,
            messages,
            cred_coordinator: CredentialResponseCoordinator::new(config.auto_accept_credentials),
            proof_coordinator: ProofResponseCoordinator::new(config.auto_accept_proofs),
            events,
            outbound,
            our_service: config.service,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.events.subscribe()
    }

    pub async fn credential_record(&self, id: &str) -> EngineResult<CredentialExchangeRecord> {
        self.cred_records.get_by_id(id).await
    }

    pub async fn proof_record(&self, id: &str) -> EngineResult<ProofExchangeRecord> {
        self.proof_records.get_by_id(id).await
    }

    /// Process one wire message. Protocol failures are contained here: the
    /// affected exchange is moved to its abandoned state and the error is not
    /// propagated. Only input that cannot be attributed to any exchange at
    /// all (unparseable JSON, unknown `@type`) is returned as an error.
    pub async fn handle_inbound(
        &self,
        message: Value,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        let thread_id = wire_thread_id(&message)?;
        let parsed: ExchangeMessage = serde_json::from_value(message)?;
        let is_credential = matches!(parsed, ExchangeMessage::CredentialIssuance(_));

        let lock = self.thread_lock(&thread_id).await;
        let guard = lock.lock().await;

        if let Err(err) = self.dispatch(parsed, connection_id).await {
            error!("failed handling inbound message on thread {thread_id}: {err}");
            self.abandon_thread(is_credential, &thread_id, err.to_string())
                .await;
        }
        drop(guard);
        self.release_thread_lock(is_credential, &thread_id).await;
        Ok(())
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks.entry(thread_id.to_owned()).or_default().clone()
    }

    /// Terminal exchanges receive no further messages; their lock entry is
    /// removed so the table does not grow with every thread ever seen.
    async fn release_thread_lock(&self, is_credential: bool, thread_id: &str) {
        let tags = RecordTags::builder()
            .thread_id(Some(thread_id.to_owned()))
            .build();
        let terminal = if is_credential {
            matches!(
                self.cred_records.find_by_tags(&tags).await,
                Ok(Some(record)) if record.state.is_terminal()
            )
        } else {
            matches!(
                self.proof_records.find_by_tags(&tags).await,
                Ok(Some(record)) if record.state.is_terminal()
            )
        };
        if terminal {
            self.thread_locks.lock().await.remove(thread_id);
        }
    }

    async fn abandon_thread(&self, is_credential: bool, thread_id: &str, error_message: String) {
        let tags = RecordTags::builder()
            .thread_id(Some(thread_id.to_owned()))
            .build();
        let result = if is_credential {
            match self.cred_records.find_by_tags(&tags).await {
                Ok(Some(record)) => match record.protocol_version {
                    ProtocolVersion::V1 => {
                        self.issuance_v1.abandon(&record.id, error_message).await.map(|_| ())
                    }
                    ProtocolVersion::V2 => {
                        self.issuance_v2.abandon(&record.id, error_message).await.map(|_| ())
                    }
                },
                _ => Ok(()),
            }
        } else {
            match self.proof_records.find_by_tags(&tags).await {
                Ok(Some(record)) => match record.protocol_version {
                    ProtocolVersion::V1 => {
                        self.presentation_v1.abandon(&record.id, error_message).await.map(|_| ())
                    }
                    ProtocolVersion::V2 => {
                        self.presentation_v2.abandon(&record.id, error_message).await.map(|_| ())
                    }
                },
                _ => Ok(()),
            }
        };
        if let Err(err) = result {
            debug!("could not abandon exchange on thread {thread_id}: {err}");
        }
    }

    async fn dispatch(
        &self,
        message: ExchangeMessage,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        use CredentialIssuance as Ci;
        use ExchangeMessage as Em;
        use PresentProof as Pp;

        match message {
            Em::CredentialIssuance(Ci::V1(msg)) => {
                self.dispatch_issuance_v1(msg, connection_id).await
            }
            Em::CredentialIssuance(Ci::V2(msg)) => {
                self.dispatch_issuance_v2(msg, connection_id).await
            }
            Em::PresentProof(Pp::V1(msg)) => self.dispatch_presentation_v1(msg, connection_id).await,
            Em::PresentProof(Pp::V2(msg)) => self.dispatch_presentation_v2(msg, connection_id).await,
        }
    }

    async fn dispatch_issuance_v1(
        &self,
        msg: CredentialIssuanceV1,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        match msg {
            CredentialIssuanceV1::ProposeCredential(m) => {
                let service = m.decorators.service.clone();
                let attributes = m.content.credential_proposal.attributes.clone();
                let proposal_attrs = serde_json::to_value(&attributes)?;
                let record = self.issuance_v1.process_proposal(m, connection_id).await?;

                let offered = self.stored_offer_attrs(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_proposal(
                    &record,
                    &proposal_attrs,
                    offered.as_ref(),
                ) {
                    let data = CredentialOfferData::builder().attributes(attributes).build();
                    let (mut offer, _) = self
                        .issuance_v1
                        .create_offer(Some(&record.id), None, data)
                        .await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        offer.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(offer.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV1::OfferCredential(m) => {
                let service = m.decorators.service.clone();
                let offer_attrs = serde_json::to_value(&m.content.credential_preview.attributes)?;
                let record = self.issuance_v1.process_offer(m, connection_id).await?;

                let proposed = self.stored_proposal_attrs(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_offer(
                    &record,
                    &offer_attrs,
                    proposed.as_ref(),
                ) {
                    let (mut request, _) = self.issuance_v1.create_request(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        request.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(request.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV1::RequestCredential(m) => {
                let service = m.decorators.service.clone();
                let request_payload = first_attachment_payload(&m.content.requests_attach)?;
                let record = self.issuance_v1.process_request(m).await?;

                let offer_payload = self.stored_offer_payload(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_request(
                    &record,
                    &request_payload,
                    offer_payload.as_ref(),
                ) {
                    let (mut credential, _) =
                        self.issuance_v1.create_credential(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        credential.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(credential.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV1::IssueCredential(m) => {
                let service = m.decorators.service.clone();
                let credential_payload = first_attachment_payload(&m.content.credentials_attach)?;
                let (record, ack_requested) = self.issuance_v1.process_credential(m).await?;

                let offer_payload = self.stored_offer_payload(&record.id).await?;
                if ack_requested
                    && self.cred_coordinator.should_auto_respond_to_credential(
                        &record,
                        &credential_payload,
                        offer_payload.as_ref(),
                    )
                {
                    let (ack, _) = self.issuance_v1.create_ack(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    self.outbound.send(ack.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV1::Ack(m) => {
                self.issuance_v1.process_ack(m).await?;
                Ok(())
            }
            CredentialIssuanceV1::ProblemReport(m) => {
                self.issuance_v1.process_problem_report(m).await?;
                Ok(())
            }
        }
    }

    async fn dispatch_issuance_v2(
        &self,
        msg: CredentialIssuanceV2,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        match msg {
            CredentialIssuanceV2::ProposeCredential(m) => {
                let service = m.decorators.service.clone();
                let attributes = m.content.credential_preview.attributes.clone();
                let proposal_attrs = serde_json::to_value(&attributes)?;
                let record = self.issuance_v2.process_proposal(m, connection_id).await?;

                let offered = self.stored_offer_attrs(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_proposal(
                    &record,
                    &proposal_attrs,
                    offered.as_ref(),
                ) {
                    let data = CredentialOfferData::builder().attributes(attributes).build();
                    let (mut offer, _) = self
                        .issuance_v2
                        .create_offer(Some(&record.id), None, data)
                        .await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        offer.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(offer.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV2::OfferCredential(m) => {
                let service = m.decorators.service.clone();
                let offer_attrs = serde_json::to_value(&m.content.credential_preview.attributes)?;
                let record = self.issuance_v2.process_offer(m, connection_id).await?;

                let proposed = self.stored_proposal_attrs(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_offer(
                    &record,
                    &offer_attrs,
                    proposed.as_ref(),
                ) {
                    let (mut request, _) = self.issuance_v2.create_request(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        request.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(request.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV2::RequestCredential(m) => {
                let service = m.decorators.service.clone();
                let request_payload = first_attachment_payload(&m.content.requests_attach)?;
                let record = self.issuance_v2.process_request(m).await?;

                let offer_payload = self.stored_offer_payload(&record.id).await?;
                if self.cred_coordinator.should_auto_respond_to_request(
                    &record,
                    &request_payload,
                    offer_payload.as_ref(),
                ) {
                    let (mut credential, _) =
                        self.issuance_v2.create_credential(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        credential.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(credential.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV2::IssueCredential(m) => {
                let service = m.decorators.service.clone();
                let credential_payload = first_attachment_payload(&m.content.credentials_attach)?;
                let (record, ack_requested) = self.issuance_v2.process_credential(m).await?;

                let offer_payload = self.stored_offer_payload(&record.id).await?;
                if ack_requested
                    && self.cred_coordinator.should_auto_respond_to_credential(
                        &record,
                        &credential_payload,
                        offer_payload.as_ref(),
                    )
                {
                    let (ack, _) = self.issuance_v2.create_ack(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    self.outbound.send(ack.into(), routing).await?;
                }
                Ok(())
            }
            CredentialIssuanceV2::Ack(m) => {
                self.issuance_v2.process_ack(m).await?;
                Ok(())
            }
            CredentialIssuanceV2::ProblemReport(m) => {
                self.issuance_v2.process_problem_report(m).await?;
                Ok(())
            }
        }
    }

    async fn dispatch_presentation_v1(
        &self,
        msg: PresentProofV1,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        match msg {
            PresentProofV1::RequestPresentation(m) => {
                let service = m.decorators.service.clone();
                let record = self.presentation_v1.process_request(m, connection_id).await?;

                if self.proof_coordinator.should_auto_respond_to_request(&record) {
                    let (mut presentation, _) =
                        self.presentation_v1.create_presentation(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        presentation.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(presentation.into(), routing).await?;
                }
                Ok(())
            }
            PresentProofV1::Presentation(m) => {
                let service = m.decorators.service.clone();
                let record = self.presentation_v1.process_presentation(m).await?;

                if self.proof_coordinator.should_auto_respond_to_presentation(&record) {
                    let (ack, _) = self.presentation_v1.create_ack(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    self.outbound.send(ack.into(), routing).await?;
                }
                Ok(())
            }
            PresentProofV1::Ack(m) => {
                self.presentation_v1.process_ack(m).await?;
                Ok(())
            }
            PresentProofV1::ProblemReport(m) => {
                self.presentation_v1.process_problem_report(m).await?;
                Ok(())
            }
        }
    }

    async fn dispatch_presentation_v2(
        &self,
        msg: PresentProofV2,
        connection_id: Option<String>,
    ) -> EngineResult<()> {
        match msg {
            PresentProofV2::RequestPresentation(m) => {
                let service = m.decorators.service.clone();
                let record = self.presentation_v2.process_request(m, connection_id).await?;

                if self.proof_coordinator.should_auto_respond_to_request(&record) {
                    let (mut presentation, _) =
                        self.presentation_v2.create_presentation(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    if matches!(routing, RoutingContext::Service { .. }) {
                        presentation.decorators.service = self.our_service.clone();
                    }
                    self.outbound.send(presentation.into(), routing).await?;
                }
                Ok(())
            }
            PresentProofV2::Presentation(m) => {
                let service = m.decorators.service.clone();
                let record = self.presentation_v2.process_presentation(m).await?;

                if self.proof_coordinator.should_auto_respond_to_presentation(&record) {
                    let (ack, _) = self.presentation_v2.create_ack(&record.id).await?;
                    let routing = self.routing(record.connection_id.as_deref(), service)?;
                    self.outbound.send(ack.into(), routing).await?;
                }
                Ok(())
            }
            PresentProofV2::Ack(m) => {
                self.presentation_v2.process_ack(m).await?;
                Ok(())
            }
            PresentProofV2::ProblemReport(m) => {
                self.presentation_v2.process_problem_report(m).await?;
                Ok(())
            }
        }
    }

    fn routing(
        &self,
        connection_id: Option<&str>,
        counterpart_service: Option<ServiceDecorator>,
    ) -> EngineResult<RoutingContext> {
        if let Some(connection_id) = connection_id {
            return Ok(RoutingContext::Connection {
                connection_id: connection_id.to_owned(),
            });
        }
        let service = counterpart_service.ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::PostMessageFailed,
                "no connection and no ~service to reply to",
            )
        })?;
        let sender_key = self
            .our_service
            .as_ref()
            .and_then(|s| s.recipient_keys.first().cloned());
        Ok(RoutingContext::Service {
            service,
            sender_key,
        })
    }

    /// The `~service` block from the latest message the counterparty sent on
    /// the exchange, checked newest first.
    async fn counterpart_service(&self, record_id: &str) -> Option<ServiceDecorator> {
        for kind in [
            StoredMessageKind::Presentation,
            StoredMessageKind::Credential,
            StoredMessageKind::Request,
            StoredMessageKind::Offer,
            StoredMessageKind::Proposal,
        ] {
            if let Some(message) = self.messages.find(record_id, kind).await {
                if let Some(service) = message_service(&message) {
                    return Some(service);
                }
            }
        }
        None
    }

    async fn stored_proposal_attrs(&self, record_id: &str) -> EngineResult<Option<Value>> {
        use CredentialIssuance as Ci;
        match self.messages.find(record_id, StoredMessageKind::Proposal).await {
            Some(ExchangeMessage::CredentialIssuance(Ci::V1(
                CredentialIssuanceV1::ProposeCredential(p),
            ))) => Ok(Some(serde_json::to_value(&p.content.credential_proposal.attributes)?)),
            Some(ExchangeMessage::CredentialIssuance(Ci::V2(
                CredentialIssuanceV2::ProposeCredential(p),
            ))) => Ok(Some(serde_json::to_value(&p.content.credential_preview.attributes)?)),
            _ => Ok(None),
        }
    }

    async fn stored_offer_attrs(&self, record_id: &str) -> EngineResult<Option<Value>> {
        use CredentialIssuance as Ci;
        match self.messages.find(record_id, StoredMessageKind::Offer).await {
            Some(ExchangeMessage::CredentialIssuance(Ci::V1(
                CredentialIssuanceV1::OfferCredential(o),
            ))) => Ok(Some(serde_json::to_value(&o.content.credential_preview.attributes)?)),
            Some(ExchangeMessage::CredentialIssuance(Ci::V2(
                CredentialIssuanceV2::OfferCredential(o),
            ))) => Ok(Some(serde_json::to_value(&o.content.credential_preview.attributes)?)),
            _ => Ok(None),
        }
    }

    async fn stored_offer_payload(&self, record_id: &str) -> EngineResult<Option<Value>> {
        use CredentialIssuance as Ci;
        match self.messages.find(record_id, StoredMessageKind::Offer).await {
            Some(ExchangeMessage::CredentialIssuance(Ci::V1(
                CredentialIssuanceV1::OfferCredential(o),
            ))) => Ok(Some(first_attachment_payload(&o.content.offers_attach)?)),
            Some(ExchangeMessage::CredentialIssuance(Ci::V2(
                CredentialIssuanceV2::OfferCredential(o),
            ))) => Ok(Some(first_attachment_payload(&o.content.offers_attach)?)),
            _ => Ok(None),
        }
    }

    // Caller-driven operations. These build and persist the protocol message
    // and deliver it when a route exists; a message created without any route
    // (no connection, counterparty unknown yet) is returned for out-of-band
    // delivery.

    pub async fn propose_credential(
        &self,
        version: ProtocolVersion,
        connection_id: Option<String>,
        data: CredentialProposalData,
    ) -> EngineResult<(ExchangeMessage, CredentialExchangeRecord)> {
        let (message, record) = match version {
            ProtocolVersion::V1 => {
                let (mut msg, record) =
                    self.issuance_v1.create_proposal(connection_id, data).await?;
                if record.connection_id.is_none() {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) =
                    self.issuance_v2.create_proposal(connection_id, data).await?;
                if record.connection_id.is_none() {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.send_if_routable(message.clone(), &record.connection_id, None).await?;
        Ok((message, record))
    }

    pub async fn offer_credential(
        &self,
        version: ProtocolVersion,
        connection_id: Option<String>,
        data: CredentialOfferData,
    ) -> EngineResult<(ExchangeMessage, CredentialExchangeRecord)> {
        let (message, record) = match version {
            ProtocolVersion::V1 => {
                let (mut msg, record) =
                    self.issuance_v1.create_offer(None, connection_id, data).await?;
                if record.connection_id.is_none() {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) =
                    self.issuance_v2.create_offer(None, connection_id, data).await?;
                if record.connection_id.is_none() {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.send_if_routable(message.clone(), &record.connection_id, None).await?;
        Ok((message, record))
    }

    /// Issuer answers a received proposal with an offer.
    pub async fn accept_credential_proposal(
        &self,
        record_id: &str,
        data: CredentialOfferData,
    ) -> EngineResult<CredentialExchangeRecord> {
        let record = self.cred_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (mut msg, record) =
                    self.issuance_v1.create_offer(Some(record_id), None, data).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) =
                    self.issuance_v2.create_offer(Some(record_id), None, data).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    /// Holder answers a received offer with a credential request.
    pub async fn accept_credential_offer(
        &self,
        record_id: &str,
    ) -> EngineResult<CredentialExchangeRecord> {
        let record = self.cred_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (mut msg, record) = self.issuance_v1.create_request(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) = self.issuance_v2.create_request(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    /// Issuer answers a received request with the credential.
    pub async fn accept_credential_request(
        &self,
        record_id: &str,
    ) -> EngineResult<CredentialExchangeRecord> {
        let record = self.cred_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (mut msg, record) = self.issuance_v1.create_credential(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) = self.issuance_v2.create_credential(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    /// Holder acknowledges a received credential.
    pub async fn accept_credential(
        &self,
        record_id: &str,
    ) -> EngineResult<CredentialExchangeRecord> {
        let record = self.cred_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (msg, record) = self.issuance_v1.create_ack(record_id).await?;
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (msg, record) = self.issuance_v2.create_ack(record_id).await?;
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    /// Reject the credential exchange; the counterparty is told through a
    /// problem report.
    pub async fn decline_credential(
        &self,
        record_id: &str,
        comment: Option<String>,
    ) -> EngineResult<CredentialExchangeRecord> {
        let record = self.cred_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (msg, record) = self.issuance_v1.decline(record_id, comment).await?;
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (msg, record) = self.issuance_v2.decline(record_id, comment).await?;
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    pub async fn request_presentation(
        &self,
        version: ProtocolVersion,
        connection_id: Option<String>,
        mut data: PresentationRequestData,
    ) -> EngineResult<(ExchangeMessage, ProofExchangeRecord)> {
        if connection_id.is_none() && data.service.is_none() {
            data.service = self.our_service.clone();
        }
        let (message, record) = match version {
            ProtocolVersion::V1 => {
                let (msg, record) =
                    self.presentation_v1.create_request(connection_id, data).await?;
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (msg, record) =
                    self.presentation_v2.create_request(connection_id, data).await?;
                (ExchangeMessage::from(msg), record)
            }
        };
        self.send_if_routable(message.clone(), &record.connection_id, None).await?;
        Ok((message, record))
    }

    /// Prover answers a received request with a presentation.
    pub async fn accept_presentation_request(
        &self,
        record_id: &str,
    ) -> EngineResult<ProofExchangeRecord> {
        let record = self.proof_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (mut msg, record) =
                    self.presentation_v1.create_presentation(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (mut msg, record) =
                    self.presentation_v2.create_presentation(record_id).await?;
                if matches!(routing, RoutingContext::Service { .. }) {
                    msg.decorators.service = self.our_service.clone();
                }
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    /// Verifier acknowledges a received presentation.
    pub async fn accept_presentation(&self, record_id: &str) -> EngineResult<ProofExchangeRecord> {
        let record = self.proof_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (msg, record) = self.presentation_v1.create_ack(record_id).await?;
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (msg, record) = self.presentation_v2.create_ack(record_id).await?;
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    pub async fn decline_presentation(
        &self,
        record_id: &str,
        comment: Option<String>,
    ) -> EngineResult<ProofExchangeRecord> {
        let record = self.proof_records.get_by_id(record_id).await?;
        let counterpart = self.counterpart_service(record_id).await;
        let routing = self.routing(record.connection_id.as_deref(), counterpart)?;

        let (message, record) = match record.protocol_version {
            ProtocolVersion::V1 => {
                let (msg, record) = self.presentation_v1.decline(record_id, comment).await?;
                (ExchangeMessage::from(msg), record)
            }
            ProtocolVersion::V2 => {
                let (msg, record) = self.presentation_v2.decline(record_id, comment).await?;
                (ExchangeMessage::from(msg), record)
            }
        };
        self.outbound.send(message, routing).await?;
        Ok(record)
    }

    async fn send_if_routable(
        &self,
        message: ExchangeMessage,
        connection_id: &Option<String>,
        counterpart_service: Option<ServiceDecorator>,
    ) -> EngineResult<()> {
        match self.routing(connection_id.as_deref(), counterpart_service) {
            Ok(routing) => self.outbound.send(message, routing).await,
            // Out-of-band creation; the caller delivers the message.
            Err(err) if err.kind() == EngineErrorKind::PostMessageFailed => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// The thread id of a raw wire message, read off the envelope before the
/// message is parsed.
fn wire_thread_id(message: &Value) -> EngineResult<String> {
    if let Some(thid) = message
        .get("~thread")
        .and_then(|t| t.get("thid"))
        .and_then(Value::as_str)
    {
        return Ok(thid.to_owned());
    }
    message
        .get("@id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::InvalidJson,
                "message has neither ~thread.thid nor @id",
            )
        })
}

fn message_service(message: &ExchangeMessage) -> Option<ServiceDecorator> {
    use CredentialIssuance as Ci;
    use CredentialIssuanceV1 as Cv1;
    use CredentialIssuanceV2 as Cv2;
    use ExchangeMessage as Em;
    use PresentProof as Pp;
    use PresentProofV1 as Pv1;
    use PresentProofV2 as Pv2;

    match message {
        Em::CredentialIssuance(Ci::V1(Cv1::ProposeCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V1(Cv1::OfferCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V1(Cv1::RequestCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V1(Cv1::IssueCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V2(Cv2::ProposeCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V2(Cv2::OfferCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V2(Cv2::RequestCredential(m))) => m.decorators.service.clone(),
        Em::CredentialIssuance(Ci::V2(Cv2::IssueCredential(m))) => m.decorators.service.clone(),
        Em::PresentProof(Pp::V1(Pv1::RequestPresentation(m))) => m.decorators.service.clone(),
        Em::PresentProof(Pp::V1(Pv1::Presentation(m))) => m.decorators.service.clone(),
        Em::PresentProof(Pp::V2(Pv2::RequestPresentation(m))) => m.decorators.service.clone(),
        Em::PresentProof(Pp::V2(Pv2::Presentation(m))) => m.decorators.service.clone(),
        _ => None,
    }
}
