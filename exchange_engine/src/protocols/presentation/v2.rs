//! The `present-proof` 2.0 service, with format negotiation over the
//! `formats` specifiers.

use std::sync::Arc;

use log::info;
use messages::{
    decorators::{
        please_ack::{AckOn, PleaseAck},
        thread::Thread,
    },
    msg_fields::{
        notification::{AckContent, AckDecorators, AckStatus},
        present_proof::{
            v2::{
                ack::AckPresentationV2,
                present::{PresentationV2, PresentationV2Content, PresentationV2Decorators},
                problem_report::PresentProofV2ProblemReport,
                request::{RequestPresentationV2, RequestPresentationV2Content, RequestPresentationV2Decorators},
                PresentProofV2,
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
    formats::{hlindy, ld_proof, AttachmentId, FormatRegistry},
    protocols::{
        issuance::format_specifier,
        machine::{proof_transition, ProofStep},
        negotiated_attachment, thread_id_of,
    },
    records::{ProofExchangeRecord, ProofRole, ProofState, ProtocolVersion},
    storage::{ExchangeMessageStore, ExchangeRecordStore, RecordTags, StoredMessageKind},
};

/// The presentation format answering a given request format.
fn presentation_format_for(request_format: &str) -> &str {
    match request_format {
        hlindy::PROOF_REQ => hlindy::PROOF,
        ld_proof::PRESENTATION_EXCHANGE_DEFINITIONS => ld_proof::PRESENTATION_EXCHANGE_SUBMISSION,
        other => other,
    }
}

pub struct PresentationServiceV2 {
    records: Arc<dyn ExchangeRecordStore<ProofExchangeRecord>>,
    messages: Arc<ExchangeMessageStore>,
    formats: Arc<FormatRegistry>,
    events: EventBus,
}

impl PresentationServiceV2 {
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
    ) -> EngineResult<(RequestPresentationV2, ProofExchangeRecord)> {
        let state = proof_transition(None, ProofRole::Verifier, ProofStep::SendRequest)?;

        let format = data.format.as_deref().unwrap_or(hlindy::PROOF_REQ).to_owned();
        let plugin = self.formats.resolve(&format)?;
        let payload = request_payload(&data);
        let attach_id = AttachmentId::PresentationRequest.as_ref().to_owned();
        let request_attach = plugin.create_attachment(&payload, attach_id.clone()).await?;

        let msg_id = Uuid::new_v4().to_string();
        let content = RequestPresentationV2Content::builder()
            .formats(vec![format_specifier(attach_id, &format)])
            .request_presentations_attach(vec![request_attach])
            .comment(data.comment)
            .will_confirm(Some(true))
            .build();
        let decorators = RequestPresentationV2Decorators::builder()
            .service(data.service)
            .build();
        let msg = RequestPresentationV2::builder()
            .id(msg_id.clone())
            .content(content)
            .decorators(decorators)
            .build();

        let record = ProofExchangeRecord::new(
            msg_id,
            connection_id,
            ProtocolVersion::V2,
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
        request: RequestPresentationV2,
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

        let (format, attachment) = self.negotiated_request_attachment(&request)?;
        let plugin = self.formats.resolve(&format)?;
        plugin.process_attachment(attachment).await?;

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
            ProtocolVersion::V2,
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
    ) -> EngineResult<(PresentationV2, ProofExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, ProofRole::Prover)?;
        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Prover, ProofStep::SendPresentation)?;

        let request = self.stored_request(&record.id).await?;
        let (request_format, request_attach) = self.negotiated_request_attachment(&request)?;
        let request_plugin = self.formats.resolve(&request_format)?;
        let request_payload = request_plugin.process_attachment(request_attach).await?;

        let format = presentation_format_for(&request_format).to_owned();
        let plugin = self.formats.resolve(&format)?;
        let presentation_payload = plugin.create_presentation_payload(&request_payload).await?;
        let attach_id = AttachmentId::Presentation.as_ref().to_owned();
        let presentation_attach = plugin
            .create_attachment(&presentation_payload, attach_id.clone())
            .await?;

        let content = PresentationV2Content::builder()
            .formats(vec![format_specifier(attach_id, &format)])
            .presentations_attach(vec![presentation_attach])
            .build();
        let decorators = PresentationV2Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .please_ack(Some(PleaseAck::builder().on(vec![AckOn::Outcome]).build()))
            .build();
        let msg = PresentationV2::builder()
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
        presentation: PresentationV2,
    ) -> EngineResult<ProofExchangeRecord> {
        let thread_id = presentation.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, ProofRole::Verifier)?;

        let (format, attachment) = negotiated_attachment(
            &self.formats,
            presentation.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &presentation.content.presentations_attach,
        )?;
        let plugin = self.formats.resolve(&format)?;
        let presentation_payload = plugin.process_attachment(attachment).await?;

        let request = self.stored_request(&record.id).await?;
        let (request_format, request_attach) = self.negotiated_request_attachment(&request)?;
        let request_plugin = self.formats.resolve(&request_format)?;
        let request_payload = request_plugin.process_attachment(request_attach).await?;
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
    ) -> EngineResult<(AckPresentationV2, ProofExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, ProofRole::Verifier)?;
        let previous = Some(record.state);
        let state = proof_transition(previous, ProofRole::Verifier, ProofStep::SendAck)?;

        let content = AckContent::builder().status(AckStatus::Ok).build();
        let decorators = AckDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = AckPresentationV2::builder()
            .id(Uuid::new_v4().to_string())
            .content(content.into())
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        Ok((msg, record))
    }

    pub async fn process_ack(&self, ack: AckPresentationV2) -> EngineResult<ProofExchangeRecord> {
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
    ) -> EngineResult<(PresentProofV2ProblemReport, ProofExchangeRecord)> {
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
        let msg = PresentProofV2ProblemReport::builder()
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
        report: PresentProofV2ProblemReport,
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

    fn negotiated_request_attachment<'a>(
        &self,
        request: &'a RequestPresentationV2,
    ) -> EngineResult<(String, &'a messages::decorators::attachment::Attachment)> {
        negotiated_attachment(
            &self.formats,
            request.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &request.content.request_presentations_attach,
        )
    }

    async fn stored_request(&self, record_id: &str) -> EngineResult<RequestPresentationV2> {
        match self.messages.get(record_id, StoredMessageKind::Request).await? {
            ExchangeMessage::PresentProof(PresentProof::V2(PresentProofV2::RequestPresentation(
                request,
            ))) => Ok(request),
            other => Err(EngineError::from_msg(
                EngineErrorKind::InvalidState,
                format!("stored request for record {record_id} has unexpected type {}", other.msg_type()),
            )),
        }
    }
}
