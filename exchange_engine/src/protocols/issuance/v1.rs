//! The `issue-credential` 1.0 service. Attachment payloads always use the
//! Hyperledger Indy style format; 1.0 predates format negotiation.

use std::sync::Arc;

use log::{info, trace};
use messages::{
    decorators::{
        please_ack::{AckOn, PleaseAck},
        thread::Thread,
    },
    msg_fields::{
        cred_issuance::{
            v1::{
                ack::AckCredentialV1,
                issue_credential::{IssueCredentialV1, IssueCredentialV1Content, IssueCredentialV1Decorators},
                offer_credential::{OfferCredentialV1, OfferCredentialV1Content, OfferCredentialV1Decorators},
                problem_report::CredIssuanceV1ProblemReport,
                propose_credential::{ProposeCredentialV1, ProposeCredentialV1Content, ProposeCredentialV1Decorators},
                request_credential::{RequestCredentialV1, RequestCredentialV1Content, RequestCredentialV1Decorators},
                CredentialIssuanceV1, CredentialPreviewV1,
            },
            CredentialIssuance,
        },
        notification::{AckContent, AckDecorators, AckStatus},
        report_problem::{Description, ProblemReportContent, ProblemReportDecorators},
    },
    ExchangeMessage,
};
use uuid::Uuid;

use super::{values_payload, CredentialOfferData, CredentialProposalData};
use crate::{
    errors::error::prelude::*,
    events::EventBus,
    formats::{hlindy, AttachmentId, FormatRegistry},
    protocols::{
        machine::{credential_transition, CredentialStep},
        thread_id_of,
    },
    records::{CredentialExchangeRecord, CredentialRole, ProtocolVersion},
    storage::{ExchangeMessageStore, ExchangeRecordStore, RecordTags, StoredMessageKind},
    utils::{
        attachment::first_attachment_payload,
        linked_attachment::{apply_linked_attachments, linked_attachment_bytes},
    },
};

pub struct IssuanceServiceV1 {
    records: Arc<dyn ExchangeRecordStore<CredentialExchangeRecord>>,
    messages: Arc<ExchangeMessageStore>,
    formats: Arc<FormatRegistry>,
    events: EventBus,
}

impl IssuanceServiceV1 {
    pub fn new(
        records: Arc<dyn ExchangeRecordStore<CredentialExchangeRecord>>,
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

    async fn find_by_thread(&self, thread_id: &str) -> EngineResult<Option<CredentialExchangeRecord>> {
        let tags = RecordTags::builder()
            .thread_id(Some(thread_id.to_owned()))
            .build();
        self.records.find_by_tags(&tags).await
    }

    async fn resolve_thread(&self, thread_id: &str) -> EngineResult<CredentialExchangeRecord> {
        self.find_by_thread(thread_id).await?.ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::UnresolvedThread,
                format!("no credential exchange for thread {thread_id}"),
            )
        })
    }

    async fn persist(
        &self,
        previous: Option<crate::records::CredentialState>,
        record: &CredentialExchangeRecord,
    ) -> EngineResult<()> {
        self.records.save(record.clone()).await?;
        info!(
            "credential exchange {} moved {:?} -> {:?}",
            record.id, previous, record.state
        );
        self.events.publish_credential(previous, record.clone());
        Ok(())
    }

    fn expect_role(record: &CredentialExchangeRecord, role: CredentialRole) -> EngineResult<()> {
        if record.role != role {
            return Err(EngineError::from_msg(
                EngineErrorKind::ActionNotSupported,
                format!("operation requires role {role:?}, record {} is {:?}", record.id, record.role),
            ));
        }
        Ok(())
    }

    pub async fn create_proposal(
        &self,
        connection_id: Option<String>,
        data: CredentialProposalData,
    ) -> EngineResult<(ProposeCredentialV1, CredentialExchangeRecord)> {
        let state = credential_transition(None, CredentialRole::Holder, CredentialStep::SendProposal)?;

        let mut attributes = data.attributes;
        let attachments = apply_linked_attachments(&mut attributes, &data.linked_attachments)?;

        let msg_id = Uuid::new_v4().to_string();
        let content = ProposeCredentialV1Content::builder()
            .credential_proposal(CredentialPreviewV1::new(attributes))
            .comment(data.comment)
            .schema_id(data.schema_id)
            .cred_def_id(data.cred_def_id)
            .build();
        let decorators = ProposeCredentialV1Decorators::builder()
            .attachments((!attachments.is_empty()).then_some(attachments))
            .build();
        let msg = ProposeCredentialV1::builder()
            .id(msg_id.clone())
            .content(content)
            .decorators(decorators)
            .build();

        let record = CredentialExchangeRecord::new(
            msg_id,
            connection_id,
            ProtocolVersion::V1,
            CredentialRole::Holder,
            state,
            data.auto_accept,
        );
        self.persist(None, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Proposal, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_proposal(
        &self,
        proposal: ProposeCredentialV1,
        connection_id: Option<String>,
    ) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = thread_id_of(proposal.decorators.thread.as_ref(), &proposal.id);
        let existing = self.find_by_thread(&thread_id).await?;

        if existing.is_none()
            && proposal
                .decorators
                .thread
                .as_ref()
                .is_some_and(|t| t.thid != proposal.id)
        {
            return Err(EngineError::from_msg(
                EngineErrorKind::UnresolvedThread,
                format!("proposal references unknown thread {thread_id}"),
            ));
        }

        if let Some(attachments) = &proposal.decorators.attachments {
            for attachment in attachments {
                linked_attachment_bytes(attachment)?;
            }
        }

        let previous = existing.as_ref().map(|r| r.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::ReceiveProposal)?;

        let mut record = match existing {
            Some(mut record) => {
                record.state = state;
                record
            }
            None => CredentialExchangeRecord::new(
                thread_id,
                connection_id,
                ProtocolVersion::V1,
                CredentialRole::Issuer,
                state,
                None,
            ),
        };
        record.error_message = None;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Proposal, proposal.into())
            .await;
        Ok(record)
    }

    pub async fn create_offer(
        &self,
        record_id: Option<&str>,
        connection_id: Option<String>,
        data: CredentialOfferData,
    ) -> EngineResult<(OfferCredentialV1, CredentialExchangeRecord)> {
        let existing = match record_id {
            Some(id) => Some(self.records.get_by_id(id).await?),
            None => None,
        };
        if let Some(record) = &existing {
            Self::expect_role(record, CredentialRole::Issuer)?;
        }
        let previous = existing.as_ref().map(|r| r.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::SendOffer)?;

        let mut attributes = data.attributes;
        let attachments = apply_linked_attachments(&mut attributes, &data.linked_attachments)?;

        let plugin = self.formats.resolve(hlindy::CRED_ABSTRACT)?;
        let offer_attach = plugin
            .create_attachment(
                &values_payload(&attributes),
                AttachmentId::CredentialOffer.as_ref().to_owned(),
            )
            .await?;

        let msg_id = Uuid::new_v4().to_string();
        let thread = existing
            .as_ref()
            .map(|r| Thread::builder().thid(r.thread_id.clone()).build());
        let content = OfferCredentialV1Content::builder()
            .credential_preview(CredentialPreviewV1::new(attributes))
            .offers_attach(vec![offer_attach])
            .comment(data.comment)
            .build();
        let decorators = OfferCredentialV1Decorators::builder()
            .thread(thread)
            .attachments((!attachments.is_empty()).then_some(attachments))
            .build();
        let msg = OfferCredentialV1::builder()
            .id(msg_id.clone())
            .content(content)
            .decorators(decorators)
            .build();

        let record = match existing {
            Some(mut record) => {
                record.state = state;
                record
            }
            None => CredentialExchangeRecord::new(
                msg_id,
                connection_id,
                ProtocolVersion::V1,
                CredentialRole::Issuer,
                state,
                data.auto_accept,
            ),
        };
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Offer, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_offer(
        &self,
        offer: OfferCredentialV1,
        connection_id: Option<String>,
    ) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = thread_id_of(offer.decorators.thread.as_ref(), &offer.id);
        let existing = self.find_by_thread(&thread_id).await?;

        if existing.is_none()
            && offer
                .decorators
                .thread
                .as_ref()
                .is_some_and(|t| t.thid != offer.id)
        {
            return Err(EngineError::from_msg(
                EngineErrorKind::UnresolvedThread,
                format!("offer references unknown thread {thread_id}"),
            ));
        }

        // Reject malformed payloads before any state is touched.
        let plugin = self.formats.resolve(hlindy::CRED_ABSTRACT)?;
        let attachment = offer.content.offers_attach.first().ok_or_else(|| {
            EngineError::from_msg(EngineErrorKind::InvalidAttachment, "offer has no attachment")
        })?;
        let payload = plugin.process_attachment(attachment).await?;
        trace!("processing credential offer payload {payload}");

        if let Some(attachments) = &offer.decorators.attachments {
            for attachment in attachments {
                linked_attachment_bytes(attachment)?;
            }
        }

        let previous = existing.as_ref().map(|r| r.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::ReceiveOffer)?;

        let record = match existing {
            Some(mut record) => {
                record.state = state;
                record
            }
            None => CredentialExchangeRecord::new(
                thread_id,
                connection_id,
                ProtocolVersion::V1,
                CredentialRole::Holder,
                state,
                None,
            ),
        };
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Offer, offer.into())
            .await;
        Ok(record)
    }

    pub async fn create_request(
        &self,
        record_id: &str,
    ) -> EngineResult<(RequestCredentialV1, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::SendRequest)?;

        let offer = self.stored_offer(&record.id).await?;
        let offer_payload = first_attachment_payload(&offer.content.offers_attach)?;

        let plugin = self.formats.resolve(hlindy::CRED_REQ)?;
        let request_attach = plugin
            .create_attachment(
                &offer_payload,
                AttachmentId::CredentialRequest.as_ref().to_owned(),
            )
            .await?;

        let content = RequestCredentialV1Content::builder()
            .requests_attach(vec![request_attach])
            .build();
        let decorators = RequestCredentialV1Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = RequestCredentialV1::builder()
            .id(Uuid::new_v4().to_string())
            .content(content)
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Request, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_request(
        &self,
        request: RequestCredentialV1,
    ) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = request.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;

        let plugin = self.formats.resolve(hlindy::CRED_REQ)?;
        let attachment = request.content.requests_attach.first().ok_or_else(|| {
            EngineError::from_msg(EngineErrorKind::InvalidAttachment, "request has no attachment")
        })?;
        plugin.process_attachment(attachment).await?;

        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::ReceiveRequest)?;

        record.state = state;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Request, request.into())
            .await;
        Ok(record)
    }

    pub async fn create_credential(
        &self,
        record_id: &str,
    ) -> EngineResult<(IssueCredentialV1, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::SendCredential)?;

        let offer = self.stored_offer(&record.id).await?;
        let credential_payload = first_attachment_payload(&offer.content.offers_attach)?;

        let plugin = self.formats.resolve(hlindy::CRED)?;
        let credential_attach = plugin
            .create_attachment(&credential_payload, AttachmentId::Credential.as_ref().to_owned())
            .await?;

        let content = IssueCredentialV1Content::builder()
            .credentials_attach(vec![credential_attach])
            .build();
        let decorators = IssueCredentialV1Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .please_ack(Some(PleaseAck::builder().on(vec![AckOn::Outcome]).build()))
            .build();
        let msg = IssueCredentialV1::builder()
            .id(Uuid::new_v4().to_string())
            .content(content)
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Credential, msg.clone().into())
            .await;
        Ok((msg, record))
    }

    pub async fn process_credential(
        &self,
        credential: IssueCredentialV1,
    ) -> EngineResult<(CredentialExchangeRecord, bool)> {
        let thread_id = credential.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;

        let plugin = self.formats.resolve(hlindy::CRED)?;
        let attachment = credential.content.credentials_attach.first().ok_or_else(|| {
            EngineError::from_msg(EngineErrorKind::InvalidAttachment, "credential has no attachment")
        })?;
        plugin.process_attachment(attachment).await?;

        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::ReceiveCredential)?;
        let ack_requested = credential.decorators.please_ack.is_some();

        record.state = state;
        self.persist(previous, &record).await?;
        self.messages
            .put(&record.id, StoredMessageKind::Credential, credential.into())
            .await;
        Ok((record, ack_requested))
    }

    pub async fn create_ack(
        &self,
        record_id: &str,
    ) -> EngineResult<(AckCredentialV1, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::SendAck)?;

        let content = AckContent::builder().status(AckStatus::Ok).build();
        let decorators = AckDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = AckCredentialV1::builder()
            .id(Uuid::new_v4().to_string())
            .content(content.into())
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        Ok((msg, record))
    }

    pub async fn process_ack(&self, ack: AckCredentialV1) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = ack.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;

        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::ReceiveAck)?;

        record.state = state;
        self.persist(previous, &record).await?;
        Ok(record)
    }

    /// Decline the exchange and build the problem report to send.
    pub async fn decline(
        &self,
        record_id: &str,
        comment: Option<String>,
    ) -> EngineResult<(CredIssuanceV1ProblemReport, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        let previous = Some(record.state);
        let state = credential_transition(previous, record.role, CredentialStep::Decline)?;

        let content = ProblemReportContent::builder()
            .description(Some(
                Description::builder()
                    .code("issuance-abandoned".to_owned())
                    .en(comment.clone())
                    .build(),
            ))
            .comment(comment)
            .build();
        let decorators = ProblemReportDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = CredIssuanceV1ProblemReport::builder()
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
        report: CredIssuanceV1ProblemReport,
    ) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = report.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;

        let previous = Some(record.state);
        let state = credential_transition(previous, record.role, CredentialStep::Decline)?;

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

    /// Mark the exchange failed. Applied by the dispatch error boundary; no
    /// message is produced.
    pub async fn abandon(
        &self,
        record_id: &str,
        error_message: String,
    ) -> EngineResult<CredentialExchangeRecord> {
        let mut record = self.records.get_by_id(record_id).await?;
        let previous = Some(record.state);
        let state = credential_transition(previous, record.role, CredentialStep::Abandon)?;

        record.state = state;
        record.error_message = Some(error_message);
        self.persist(previous, &record).await?;
        Ok(record)
    }

    async fn stored_offer(&self, record_id: &str) -> EngineResult<OfferCredentialV1> {
        match self.messages.get(record_id, StoredMessageKind::Offer).await? {
            ExchangeMessage::CredentialIssuance(CredentialIssuance::V1(
                CredentialIssuanceV1::OfferCredential(offer),
            )) => Ok(offer),
            other => Err(EngineError::from_msg(
                EngineErrorKind::InvalidState,
                format!("stored offer for record {record_id} has unexpected type {}", other.msg_type()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use messages::msg_fields::cred_issuance::CredentialAttr;
    use serde_json::json;

    use super::*;
    use crate::{
        formats::hlindy::HyperledgerIndyFormat,
        records::CredentialState,
        storage::InMemoryRecordStore,
    };

    fn service() -> IssuanceServiceV1 {
        let formats = FormatRegistry::new().register(Arc::new(
            HyperledgerIndyFormat::with_credential_values(HashMap::from([(
                "name".to_owned(),
                json!("John"),
            )])),
        ));
        IssuanceServiceV1::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(ExchangeMessageStore::new()),
            Arc::new(formats),
            EventBus::default(),
        )
    }

    fn attrs() -> Vec<CredentialAttr> {
        vec![CredentialAttr::builder()
            .name("name".to_owned())
            .value("John".to_owned())
            .build()]
    }

    #[tokio::test]
    async fn test_proposal_offer_exchange() {
        let holder = service();
        let issuer = service();

        let data = CredentialProposalData::builder().attributes(attrs()).build();
        let (proposal, holder_record) = holder
            .create_proposal(Some("conn-1".to_owned()), data)
            .await
            .unwrap();
        assert_eq!(holder_record.state, CredentialState::ProposalSent);
        assert_eq!(holder_record.thread_id, proposal.id);

        let issuer_record = issuer
            .process_proposal(proposal, Some("conn-2".to_owned()))
            .await
            .unwrap();
        assert_eq!(issuer_record.state, CredentialState::ProposalReceived);

        let offer_data = CredentialOfferData::builder().attributes(attrs()).build();
        let (offer, issuer_record) = issuer
            .create_offer(Some(&issuer_record.id), None, offer_data)
            .await
            .unwrap();
        assert_eq!(issuer_record.state, CredentialState::OfferSent);
        assert_eq!(
            offer.decorators.thread.as_ref().unwrap().thid,
            issuer_record.thread_id
        );

        let holder_record = holder.process_offer(offer, None).await.unwrap();
        assert_eq!(holder_record.state, CredentialState::OfferReceived);
    }

    #[tokio::test]
    async fn test_full_flow_to_done() {
        let holder = service();
        let issuer = service();

        let offer_data = CredentialOfferData::builder().attributes(attrs()).build();
        let (offer, issuer_record) = issuer
            .create_offer(None, Some("conn".to_owned()), offer_data)
            .await
            .unwrap();
        let holder_record = holder.process_offer(offer, None).await.unwrap();

        let (request, _) = holder.create_request(&holder_record.id).await.unwrap();
        let issuer_record = issuer.process_request(request).await.unwrap();
        assert_eq!(issuer_record.state, CredentialState::RequestReceived);

        let (credential, _) = issuer.create_credential(&issuer_record.id).await.unwrap();
        assert!(credential.decorators.please_ack.is_some());

        let (holder_record, ack_requested) =
            holder.process_credential(credential).await.unwrap();
        assert_eq!(holder_record.state, CredentialState::CredentialReceived);
        assert!(ack_requested);

        let (ack, holder_record) = holder.create_ack(&holder_record.id).await.unwrap();
        assert_eq!(holder_record.state, CredentialState::Done);

        let issuer_record = issuer.process_ack(ack).await.unwrap();
        assert_eq!(issuer_record.state, CredentialState::Done);
    }

    #[tokio::test]
    async fn test_request_for_unknown_thread() {
        let issuer = service();
        let content = RequestCredentialV1Content::builder()
            .requests_attach(vec![
                crate::utils::attachment::make_attachment(&json!({}), "r".to_owned()).unwrap(),
            ])
            .build();
        let decorators = RequestCredentialV1Decorators::builder()
            .thread(Thread::builder().thid("unknown".to_owned()).build())
            .build();
        let request = RequestCredentialV1::builder()
            .id("msg".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        let err = issuer.process_request(request).await.unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::UnresolvedThread);
    }

    #[tokio::test]
    async fn test_decline_builds_problem_report() {
        let issuer = service();
        let holder = service();

        let offer_data = CredentialOfferData::builder().attributes(attrs()).build();
        let (offer, _) = issuer.create_offer(None, None, offer_data).await.unwrap();
        let holder_record = holder.process_offer(offer, None).await.unwrap();

        let (report, holder_record) = holder
            .decline(&holder_record.id, Some("not interested".to_owned()))
            .await
            .unwrap();
        assert_eq!(holder_record.state, CredentialState::Declined);
        assert_eq!(report.decorators.thread.thid, holder_record.thread_id);
        assert_eq!(
            report.content.inner.description.as_ref().unwrap().code,
            "issuance-abandoned"
        );

        // Terminal records accept no further steps.
        let err = holder.create_request(&holder_record.id).await.unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::StateTransition);
    }

    #[tokio::test]
    async fn test_abandon_keeps_error_message() {
        let holder = service();
        let data = CredentialProposalData::builder().attributes(attrs()).build();
        let (_, record) = holder.create_proposal(None, data).await.unwrap();

        let record = holder
            .abandon(&record.id, "boom".to_owned())
            .await
            .unwrap();
        assert_eq!(record.state, CredentialState::Abandoned);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }
}
