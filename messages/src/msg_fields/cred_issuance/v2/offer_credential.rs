use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::CredentialPreviewV2;
use crate::{
    decorators::{
        attachment::Attachment, please_ack::PleaseAck, service::ServiceDecorator, thread::Thread,
        timing::Timing,
    },
    msg_fields::common::AttachmentFormatSpecifier,
    msg_parts::MsgParts,
};

pub type OfferCredentialV2 = MsgParts<OfferCredentialV2Content, OfferCredentialV2Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct OfferCredentialV2Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_preview: CredentialPreviewV2,
    pub formats: Vec<AttachmentFormatSpecifier<OfferCredentialAttachmentFormatType>>,
    #[serde(rename = "offers~attach")]
    pub offers_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct OfferCredentialV2Decorators {
    #[builder(default)]
    #[serde(rename = "~thread")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[builder(default)]
    #[serde(rename = "~service")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceDecorator>,
    #[builder(default)]
    #[serde(rename = "~please_ack")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub please_ack: Option<PleaseAck>,
    #[builder(default)]
    #[serde(rename = "~timing")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    /// Appended attachments, used for payloads linked from preview
    /// attributes.
    #[builder(default)]
    #[serde(rename = "~attach")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub enum OfferCredentialAttachmentFormatType {
    #[serde(rename = "anoncreds/credential-offer@v1.0")]
    AnoncredsCredentialOffer1_0,
    #[serde(rename = "hlindy/cred-abstract@v2.0")]
    HyperledgerIndyCredentialAbstract2_0,
    #[serde(rename = "aries/ld-proof-vc-detail@v1.0")]
    AriesLdProofVcDetail1_0,
}

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::{
            attachment::tests::make_extended_attachment, thread::tests::make_extended_thread,
        },
        misc::{test_utils, MaybeKnown},
        msg_fields::cred_issuance::CredentialAttr,
    };

    #[test]
    fn test_extended_offer_cred() {
        let attribute = CredentialAttr::builder()
            .name("test_attribute_name".to_owned())
            .value("test_attribute_value".to_owned())
            .build();

        let preview = CredentialPreviewV2::new(vec![attribute]);
        let content = OfferCredentialV2Content::builder()
            .credential_preview(preview)
            .formats(vec![AttachmentFormatSpecifier {
                attach_id: "1".to_owned(),
                format: MaybeKnown::Known(
                    OfferCredentialAttachmentFormatType::HyperledgerIndyCredentialAbstract2_0,
                ),
            }])
            .offers_attach(vec![make_extended_attachment()])
            .comment(Some("test_comment".to_owned()))
            .replacement_id(Some("replacement_id".to_owned()))
            .goal_code(Some("goal.goal".to_owned()))
            .build();

        let decorators = OfferCredentialV2Decorators::builder()
            .thread(Some(make_extended_thread()))
            .build();

        let expected = json!({
            "formats": content.formats,
            "offers~attach": content.offers_attach,
            "credential_preview": content.credential_preview,
            "comment": content.comment,
            "goal_code": content.goal_code,
            "replacement_id": content.replacement_id,
            "~thread": decorators.thread,
        });

        let msg = OfferCredentialV2::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/2.0/offer-credential",
            expected,
        );
    }
}
