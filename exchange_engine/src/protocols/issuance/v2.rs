//! The `issue-credential` 2.0 service. Messages carry `formats` specifiers
//! binding each attachment to a format identifier; the actual format used on
//! a thread is negotiated against the registered plugins.

use std::sync::Arc;

use log::{info, trace};
use messages::{
    decorators::{
        please_ack::{AckOn, PleaseAck},
        thread::Thread,
    },
    msg_fields::{
        cred_issuance::{
            v2::{
                ack::AckCredentialV2,
                issue_credential::{IssueCredentialV2, IssueCredentialV2Content, IssueCredentialV2Decorators},
                offer_credential::{OfferCredentialV2, OfferCredentialV2Content, OfferCredentialV2Decorators},
                problem_report::CredIssuanceV2ProblemReport,
                propose_credential::{ProposeCredentialV2, ProposeCredentialV2Content, ProposeCredentialV2Decorators},
                request_credential::{RequestCredentialV2, RequestCredentialV2Content, RequestCredentialV2Decorators},
                CredentialIssuanceV2, CredentialPreviewV2,
            },
            CredentialIssuance,
        },
        notification::{AckContent, AckDecorators, AckStatus},
        report_problem::{Description, ProblemReportContent, ProblemReportDecorators},
    },
    ExchangeMessage,
};
use uuid::Uuid;

use super::{format_specifier, values_payload, CredentialOfferData, CredentialProposalData};
use crate::{
    errors::error::prelude::*,
    events::EventBus,
    formats::{hlindy, ld_proof, AttachmentId, FormatRegistry},
    protocols::{
        machine::{credential_transition, CredentialStep},
        negotiated_attachment, thread_id_of,
    },
    records::{CredentialExchangeRecord, CredentialRole, ProtocolVersion},
    storage::{ExchangeMessageStore, ExchangeRecordStore, RecordTags, StoredMessageKind},
    utils::linked_attachment::{apply_linked_attachments, linked_attachment_bytes},
};

/// The format of the follow-up message for a given offer format.
fn request_format_for(offer_format: &str) -> &str {
    match offer_format {
        hlindy::CRED_ABSTRACT => hlindy::CRED_REQ,
        other => other,
    }
}

fn credential_format_for(offer_format: &str) -> &str {
    match offer_format {
        hlindy::CRED_ABSTRACT => hlindy::CRED,
        ld_proof::LD_PROOF_VC_DETAIL => ld_proof::LD_PROOF_VC,
        other => other,
    }
}

pub struct IssuanceServiceV2 {
    records: Arc<dyn ExchangeRecordStore<CredentialExchangeRecord>>,
    messages: Arc<ExchangeMessageStore>,
    formats: Arc<FormatRegistry>,
    events: EventBus,
}

impl IssuanceServiceV2 {
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
    ) -> EngineResult<(ProposeCredentialV2, CredentialExchangeRecord)> {
        let state = credential_transition(None, CredentialRole::Holder, CredentialStep::SendProposal)?;

        let mut attributes = data.attributes;
        let attachments = apply_linked_attachments(&mut attributes, &data.linked_attachments)?;

        let format = hlindy::CRED_FILTER;
        let plugin = self.formats.resolve(format)?;
        let attach_id = Uuid::new_v4().to_string();
        let filter = serde_json::json!({
            "schema_id": data.schema_id,
            "cred_def_id": data.cred_def_id,
        });
        let filter_attach = plugin.create_attachment(&filter, attach_id.clone()).await?;

        let msg_id = Uuid::new_v4().to_string();
        let content = ProposeCredentialV2Content::builder()
            .credential_preview(CredentialPreviewV2::new(attributes))
            .formats(vec![format_specifier(attach_id, format)])
            .filters_attach(vec![filter_attach])
            .comment(data.comment)
            .build();
        let decorators = ProposeCredentialV2Decorators::builder()
            .attachments((!attachments.is_empty()).then_some(attachments))
            .build();
        let msg = ProposeCredentialV2::builder()
            .id(msg_id.clone())
            .content(content)
            .decorators(decorators)
            .build();

        let record = CredentialExchangeRecord::new(
            msg_id,
            connection_id,
            ProtocolVersion::V2,
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
        proposal: ProposeCredentialV2,
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

        let offered: Vec<String> = proposal.content.formats.iter().map(|f| f.raw_format()).collect();
        let negotiated = self.formats.negotiate(offered.iter().map(String::as_str))?;
        trace!("negotiated proposal format {negotiated}");

        if let Some(attachments) = &proposal.decorators.attachments {
            for attachment in attachments {
                linked_attachment_bytes(attachment)?;
            }
        }

        let previous = existing.as_ref().map(|r| r.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::ReceiveProposal)?;

        let record = match existing {
            Some(mut record) => {
                record.state = state;
                record
            }
            None => CredentialExchangeRecord::new(
                thread_id,
                connection_id,
                ProtocolVersion::V2,
                CredentialRole::Issuer,
                state,
                None,
            ),
        };
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
    ) -> EngineResult<(OfferCredentialV2, CredentialExchangeRecord)> {
        let existing = match record_id {
            Some(id) => Some(self.records.get_by_id(id).await?),
            None => None,
        };
        if let Some(record) = &existing {
            Self::expect_role(record, CredentialRole::Issuer)?;
        }
        let previous = existing.as_ref().map(|r| r.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::SendOffer)?;

        let format = data.format.as_deref().unwrap_or(hlindy::CRED_ABSTRACT).to_owned();
        let plugin = self.formats.resolve(&format)?;

        let mut attributes = data.attributes;
        let attachments = apply_linked_attachments(&mut attributes, &data.linked_attachments)?;

        let attach_id = AttachmentId::CredentialOffer.as_ref().to_owned();
        let offer_attach = plugin
            .create_attachment(&values_payload(&attributes), attach_id.clone())
            .await?;

        let msg_id = Uuid::new_v4().to_string();
        let thread = existing
            .as_ref()
            .map(|r| Thread::builder().thid(r.thread_id.clone()).build());
        let content = OfferCredentialV2Content::builder()
            .credential_preview(CredentialPreviewV2::new(attributes))
            .formats(vec![format_specifier(attach_id, &format)])
            .offers_attach(vec![offer_attach])
            .comment(data.comment)
            .build();
        let decorators = OfferCredentialV2Decorators::builder()
            .thread(thread)
            .attachments((!attachments.is_empty()).then_some(attachments))
            .build();
        let msg = OfferCredentialV2::builder()
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
                ProtocolVersion::V2,
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
        offer: OfferCredentialV2,
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

        let (format, attachment) = negotiated_attachment(
            &self.formats,
            offer.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &offer.content.offers_attach,
        )?;
        let plugin = self.formats.resolve(&format)?;
        plugin.process_attachment(attachment).await?;

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
                ProtocolVersion::V2,
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
    ) -> EngineResult<(RequestCredentialV2, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::SendRequest)?;

        let offer = self.stored_offer(&record.id).await?;
        let (offer_format, offer_attach) = negotiated_attachment(
            &self.formats,
            offer.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &offer.content.offers_attach,
        )?;
        let offer_plugin = self.formats.resolve(&offer_format)?;
        let offer_payload = offer_plugin.process_attachment(offer_attach).await?;

        let format = request_format_for(&offer_format).to_owned();
        let plugin = self.formats.resolve(&format)?;
        let attach_id = AttachmentId::CredentialRequest.as_ref().to_owned();
        let request_attach = plugin.create_attachment(&offer_payload, attach_id.clone()).await?;

        let content = RequestCredentialV2Content::builder()
            .formats(vec![format_specifier(attach_id, &format)])
            .requests_attach(vec![request_attach])
            .build();
        let decorators = RequestCredentialV2Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = RequestCredentialV2::builder()
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
        request: RequestCredentialV2,
    ) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = request.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;

        let (format, attachment) = negotiated_attachment(
            &self.formats,
            request.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &request.content.requests_attach,
        )?;
        let plugin = self.formats.resolve(&format)?;
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
    ) -> EngineResult<(IssueCredentialV2, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::SendCredential)?;

        let offer = self.stored_offer(&record.id).await?;
        let (offer_format, offer_attach) = negotiated_attachment(
            &self.formats,
            offer.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &offer.content.offers_attach,
        )?;
        let offer_plugin = self.formats.resolve(&offer_format)?;
        let credential_payload = offer_plugin.process_attachment(offer_attach).await?;

        let format = credential_format_for(&offer_format).to_owned();
        let plugin = self.formats.resolve(&format)?;
        let attach_id = AttachmentId::Credential.as_ref().to_owned();
        let credential_attach = plugin
            .create_attachment(&credential_payload, attach_id.clone())
            .await?;

        let content = IssueCredentialV2Content::builder()
            .formats(vec![format_specifier(attach_id, &format)])
            .credentials_attach(vec![credential_attach])
            .build();
        let decorators = IssueCredentialV2Decorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .please_ack(Some(PleaseAck::builder().on(vec![AckOn::Outcome]).build()))
            .build();
        let msg = IssueCredentialV2::builder()
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
        credential: IssueCredentialV2,
    ) -> EngineResult<(CredentialExchangeRecord, bool)> {
        let thread_id = credential.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;

        let (format, attachment) = negotiated_attachment(
            &self.formats,
            credential.content.formats.iter().map(|f| (f.attach_id.clone(), f.raw_format())),
            &credential.content.credentials_attach,
        )?;
        let plugin = self.formats.resolve(&format)?;
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
    ) -> EngineResult<(AckCredentialV2, CredentialExchangeRecord)> {
        let mut record = self.records.get_by_id(record_id).await?;
        Self::expect_role(&record, CredentialRole::Holder)?;
        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Holder, CredentialStep::SendAck)?;

        let content = AckContent::builder().status(AckStatus::Ok).build();
        let decorators = AckDecorators::builder()
            .thread(Thread::builder().thid(record.thread_id.clone()).build())
            .build();
        let msg = AckCredentialV2::builder()
            .id(Uuid::new_v4().to_string())
            .content(content.into())
            .decorators(decorators)
            .build();

        record.state = state;
        self.persist(previous, &record).await?;
        Ok((msg, record))
    }

    pub async fn process_ack(&self, ack: AckCredentialV2) -> EngineResult<CredentialExchangeRecord> {
        let thread_id = ack.decorators.thread.thid.clone();
        let mut record = self.resolve_thread(&thread_id).await?;
        Self::expect_role(&record, CredentialRole::Issuer)?;

        let previous = Some(record.state);
        let state = credential_transition(previous, CredentialRole::Issuer, CredentialStep::ReceiveAck)?;

        record.state = state;
        self.persist(previous, &record).await?;
        Ok(record)
    }

    pub async fn decline(
        &self,
        record_id: &str,
        comment: Option<String>,
    ) -> EngineResult<(CredIssuanceV2ProblemReport, CredentialExchangeRecord)> {
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
        let msg = CredIssuanceV2ProblemReport::builder()
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
        report: CredIssuanceV2ProblemReport,
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

    async fn stored_offer(&self, record_id: &str) -> EngineResult<OfferCredentialV2> {
        match self.messages.get(record_id, StoredMessageKind::Offer).await? {
            ExchangeMessage::CredentialIssuance(CredentialIssuance::V2(
                CredentialIssuanceV2::OfferCredential(offer),
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
    use messages::msg_fields::cred_issuance::CredentialAttr;

    use super::*;
    use crate::{
        formats::{hlindy::HyperledgerIndyFormat, ld_proof::LdProofFormat},
        records::CredentialState,
        storage::InMemoryRecordStore,
    };

    fn service_with(formats: FormatRegistry) -> IssuanceServiceV2 {
        IssuanceServiceV2::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(ExchangeMessageStore::new()),
            Arc::new(formats),
            EventBus::default(),
        )
    }

    fn indy_registry() -> FormatRegistry {
        FormatRegistry::new().register(Arc::new(HyperledgerIndyFormat::new()))
    }

    fn attrs() -> Vec<CredentialAttr> {
        vec![CredentialAttr::builder()
            .name("degree".to_owned())
            .value("maths".to_owned())
            .build()]
    }

    #[tokio::test]
    async fn test_full_v2_flow() {
        let issuer = service_with(indy_registry());
        let holder = service_with(indy_registry());

        let offer_data = CredentialOfferData::builder().attributes(attrs()).build();
        let (offer, issuer_record) = issuer
            .create_offer(None, Some("conn".to_owned()), offer_data)
            .await
            .unwrap();
        assert_eq!(offer.content.formats[0].raw_format(), hlindy::CRED_ABSTRACT);

        let holder_record = holder.process_offer(offer, None).await.unwrap();
        assert_eq!(holder_record.state, CredentialState::OfferReceived);
        assert_eq!(holder_record.protocol_version, ProtocolVersion::V2);

        let (request, _) = holder.create_request(&holder_record.id).await.unwrap();
        assert_eq!(request.content.formats[0].raw_format(), hlindy::CRED_REQ);

        let issuer_record = issuer.process_request(request).await.unwrap();
        let (credential, _) = issuer.create_credential(&issuer_record.id).await.unwrap();
        assert_eq!(credential.content.formats[0].raw_format(), hlindy::CRED);

        let (holder_record, _) = holder.process_credential(credential).await.unwrap();
        let (ack, holder_record) = holder.create_ack(&holder_record.id).await.unwrap();
        assert_eq!(holder_record.state, CredentialState::Done);

        let issuer_record = issuer.process_ack(ack).await.unwrap();
        assert_eq!(issuer_record.state, CredentialState::Done);
    }

    #[tokio::test]
    async fn test_offer_with_unsupported_format_fails_negotiation() {
        let issuer = service_with(
            indy_registry().register(Arc::new(LdProofFormat)),
        );
        // Holder only speaks ld-proof.
        let holder = service_with(FormatRegistry::new().register(Arc::new(LdProofFormat)));

        let offer_data = CredentialOfferData::builder().attributes(attrs()).build();
        let (offer, _) = issuer.create_offer(None, None, offer_data).await.unwrap();

        let err = holder.process_offer(offer, None).await.unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::FormatNegotiation);
    }

    #[tokio::test]
    async fn test_ld_proof_offer_negotiates() {
        let issuer = service_with(
            FormatRegistry::new()
                .register(Arc::new(HyperledgerIndyFormat::new()))
                .register(Arc::new(LdProofFormat)),
        );
        let holder = service_with(FormatRegistry::new().register(Arc::new(LdProofFormat)));

        let offer_data = CredentialOfferData::builder()
            .attributes(attrs())
            .format(Some(ld_proof::LD_PROOF_VC_DETAIL.to_owned()))
            .build();
        let (offer, _) = issuer.create_offer(None, None, offer_data).await.unwrap();

        let holder_record = holder.process_offer(offer, None).await.unwrap();
        let (request, _) = holder.create_request(&holder_record.id).await.unwrap();
        assert_eq!(
            request.content.formats[0].raw_format(),
            ld_proof::LD_PROOF_VC_DETAIL
        );
    }
}
