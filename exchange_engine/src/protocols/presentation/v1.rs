//! The `present-proof` 1.0 service. Like issuance 1.0, payloads always use
//! the Hyperledger Indy style format.

use std::sync::Arc;

use log::{info, trace};
use messages::{
    decorators::{
        please_ack::{AckOn, PleaseAck},
        thread::Thread,
    },
    msg_fields::{
        notification::{AckContent, AckDecorators, AckStatus},
        present_proof::{
            v1::{
                ack::AckPresentationV1,
                present::{PresentationV1, PresentationV1Content, PresentationV1Decorators},
                problem_report::PresentProofV1ProblemReport,
                request::{RequestPresentationV1, RequestPresentationV1Content, RequestPresentationV1Decorators},
                PresentProofV1,
            },
            PresentProof,
        },
        report_problem::{Description, ProblemReportContent, ProblemReportDecorators},
    },
    ExchangeMessage,
};
use uuid::Uuid;

use super::{request_payload, PresentationRequestData};
use crate::{
    errors::error::prelude::*,
    events::EventBus,
    formats::{hlindy, AttachmentId, FormatRegistry},
    protocols::{
        machine::{proof_transition, ProofStep},
        thread_id_of,
    },
    records::{ProofExchangeRecord, ProofRole, ProofState, ProtocolVersion},
    storage::{ExchangeMessageStore, ExchangeRecordStore, RecordTags, StoredMessageKind},
    utils::attachment::first_attachment_payload,
};

pub struct PresentationServiceV1 {
    records: Arc<dyn ExchangeRecordStore<ProofExchangeRecord>>,
    messages: Arc<ExchangeMessageStore>,
    formats: Arc<FormatRegistry>,
    events: EventBus,
}

impl PresentationServiceV1 {
    pub fn new(
        records: Arc<dyn ExchangeRecordStore<ProofExchangeRecord>>,
        messages: Arc<ExchangeMessageStore>,
        formats: Arc<FormatRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            records,
            messages,
            formats,
            events,
        }
    }

    async fn find_by_thread(&self, thread_id: &str) -> EngineResult<Option<ProofExchangeRecord>> {
        let tags = RecordTags::builder()
            .thread_id(Some(thread_id.to_owned()))
            .build();
        self.records.find_by_tags(&tags).await
    }

    async fn resolve_thread(&self, thread_id: &str) -> EngineResult<ProofExchangeRecord> {
        self.find_by_thread(thread_id).await?.ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::UnresolvedThread,
                format!("no proof exchange for thread {thread_id}"),
            )
        })
    }

    async fn persist(
        &self,
        previous: Option<ProofState>,
        record: &ProofExchangeRecord,
    ) -> EngineResult<()> {
        self.records.save(record.clone()).await?;
        info!(
            "proof exchange {} moved {:?} -> {:?}",
            record.id, previous, record.state
        );
        self.events.publish_proof(previous, record.clone());
        Ok(())
    }

    fn expect_role(record: &ProofExchangeRecord, role: ProofRole) -> EngineResult<()> {
        if record.role != role {
            return Err(EngineError::from_msg(
                EngineErrorKind::ActionNotSupported,
                format!("operation requires role {role:?}, record {} is {:?}", record.id, record.role),
            ));
        }
        Ok(())
    }

    pub async fn create_request(
        &self,
        connection_id: Option<String>,
        data: PresentationRequestData,
    ) -> EngineResult<(RequestPresentationV1, ProofExchangeRecord)> {
        let state = proof_transition(None, ProofRole::Verifier, ProofStep::SendRequest)?;

        let payload = request_payload(&data);
        let plugin = self.formats.resolve(hlindy::PROOF_REQ)?;
        let request_attach = plugin
            .create_attachment(&payload, AttachmentId::PresentationRequest.as_ref().to_owned())
            .await?;

        let msg_id = Uuid::new_v4().to_string();
        let content = RequestPresentationV1Content::builder()
            .request_presentations_attach(vec![request_attach])
            .comment(data.comment)
            .build();
        let decorators = RequestPresentationV1Decorators::builder()
            .service(data.service)
            .build();
        let msg = RequestPresentationV1::builder()
            .id(msg_id.clone())
            .content(content)
            .decorators(decorators)
            .build();

        let record = ProofExchangeRecord::new(
            msg_id,
            connection_id,
            ProtocolVersion::V1,
            ProofRole::Verifier,
            state,
            data.auto_accept,
        );
        self.persist(None, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Request, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_request(
        &self,
        request: RequestPresentationV1,
        connection_id: Option<String>,
    ) -> EngineResult<ProofExchangeRecord> {
        let thread_id = thread_id_of(request.decorators.thread.as_ref(), &request.id);
        if request
            .decorators
            .thread
            .as_ref()
            .is_some_and(|t| t.thid != request.id)
        {
            return Err(EngineError::from_msg(
                EngineErrorKind::UnresolvedThread,
                format!("presentation request references unknown thread {thread_id}"),
            ));
        }

        let plugin = self.formats.resolve(hlindy::PROOF_REQ)?;
        let attachment = request
            .content
            .request_presentations_attach
            .first()
            .ok_or_else(|| {
                EngineError::from_msg(EngineErrorKind::InvalidAttachment, "request has no attachment")
            })?;
        let payload = plugin.process_attachment(attachment).await?;
        trace!("processing presentation request payload {payload}");

        // A request always opens the thread; a second one on the same thread
        // is a replay and must fail the transition instead of forking the
        // exchange into two records.
        let existing = self.find_by_thread(&thread_id).await?;
        let state = proof_transition(
            existing.map(|r| r.state),
            ProofRole::Prover,
            ProofStep::ReceiveRequest,
        )?;
        let record = ProofExchangeRecord::new(
            thread_id,
            connection_id,
            ProtocolVersion::V1,
            ProofRole::Prover,
            state,
            None,
        );
        self.persist(None, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Request, request.into())
            .await;
        Ok(record)
    }

    pub async fn create_presentation(
        &self,
        record_id: &str,
    ) -> EngineResult<(PresentationV1, ProofExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, ProofRole::Prover)?;
        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Prover, ProofStep::SendPresentation)?;

        let request = self.stored_request(&record.id).await?;
        let request_payload = first_attachment_payload(&request.content.request_presentations_attach)?;

        let plugin = self.formats.resolve(hlindy::PROOF)?;
        let presentation_payload = plugin.create_presentation_payload(&request_payload).await?;
        let presentation_attach = plugin
            .create_attachment(
                &presentation_payload,
                AttachmentId::Presentation.as_ref().to_owned(),
            )
            .await?;

        let content = PresentationV1Content::builder()
            .presentations_attach(vec![presentation_attach])
            .build();
        let decorators = PresentationV1Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .please_ack(Some(PleaseAck::builder().on(vec![AckOn::Outcome]).build()))
            .build();
        let msg = PresentationV1::builder()
            .id(Uuid::new_v4().to_string())
            .content(content)
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Presentation, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_presentation(
        &self,
        presentation: PresentationV1,
    ) -> EngineResult<ProofExchangeRecord> {
        let thread_id = presentation.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, ProofRole::Verifier)?;

        let plugin = self.formats.resolve(hlindy::PROOF)?;
        let attachment = presentation.content.presentations_attach.first().ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::InvalidAttachment,
                "presentation has no attachment",
            )
        })?;
        let presentation_payload = plugin.process_attachment(attachment).await?;

        let request = self.stored_request(&record.id).await?;
        let request_payload = first_attachment_payload(&request.content.request_presentations_attach)?;
        let verified = plugin
            .verify_presentation(&request_payload, &presentation_payload)
            .await?;

        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Verifier, ProofStep::ReceivePresentation)?;

        record.state = state;
        record.is_verified = Some(verified);
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Presentation, presentation.into())
            .await;
        Ok(record)
    }

    pub async fn create_ack(
        &self,
        record_id: &str,
    ) -> EngineResult<(AckPresentationV1, ProofExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, ProofRole::Verifier)?;
        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Verifier, ProofStep::SendAck)?;

        let content = AckContent::builder().status(AckStatus::Ok).build();
        let decorators = AckDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = AckPresentationV1::builder()
            .id(Uuid::new_v4().to_string())
            .content(content.into())
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        Ok((msg, record))
    }

    pub async fn process_ack(&self, ack: AckPresentationV1) -> EngineResult<ProofExchangeRecord> {
        let thread_id = ack.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, ProofRole::Prover)?;

        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Prover, ProofStep::ReceiveAck)?;

        record.state = state;
        self.persist(previous, &record).await?;
        Ok(record)
    }

    pub async fn decline(
        &self,
        record_id: &str,
        comment: Option<String>,
    ) -> EngineResult<(PresentProofV1ProblemReport, ProofExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        let previous = Some(record.state);
        let state = proof_transition(previous, record.role, ProofStep::Decline)?;

        let content = ProblemReportContent::builder()
            .description(Some(
                Description::builder()
                    .code("presentation-abandoned".to_owned())
                    .en(comment.clone())
                    .build(),
            ))
            .comment(comment)
            .build();
        let decorators = ProblemReportDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = PresentProofV1ProblemReport::builder()
            .id(Uuid::new_v4().to_string())
            .content(content.into())
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        Ok((msg, record))
    }

    pub async fn process_problem_report(
        &self,
        report: PresentProofV1ProblemReport,
    ) -> EngineResult<ProofExchangeRecord> {
        let thread_id = report.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;

        let previous = Some(record.state);
        let state = proof_transition(previous, record.role, ProofStep::Decline)?;

        record.state = state;
        record.error_message = report
            .content
            .inner
            .comment
            .clone()
            .or_else(|| report.content.inner.description.as_ref().map(|d| d.code.clone()));
        self.persist(previous, &record).await?;
        Ok(record)
    }

    pub async fn abandon(
        &self,
        record_id: &str,
        error_message: String,
    ) -> EngineResult<ProofExchangeRecord> {
        let mut record = self.records.get_by_id(record_id).await?;
        let previous = Some(record.state);
        let state = proof_transition(previous, record.role, ProofStep::Abandon)?;

        record.state = state;
        record.error_message = Some(error_message);
        self.persist(previous, &record).await?;
        Ok(record)
    }

    async fn stored_request(&self, record_id: &str) -> EngineResult<RequestPresentationV1> {
        match self.messages.get(record_id, StoredMessageKind::Request).await? {
            ExchangeMessage::PresentProof(PresentProof::V1(PresentProofV1::RequestPresentation(
                request,
            ))) => Ok(request),
            other => Err(EngineError::from_msg(
                EngineErrorKind::InvalidState,
                format!("stored request for record {record_id} has unexpected type {}", other.msg_type()),
            )),
        }
    }
}
