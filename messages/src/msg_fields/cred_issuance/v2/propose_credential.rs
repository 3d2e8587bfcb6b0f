use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::CredentialPreviewV2;
use crate::{
    decorators::{attachment::Attachment, service::ServiceDecorator, thread::Thread, timing::Timing},
    msg_fields::common::AttachmentFormatSpecifier,
    msg_parts::MsgParts,
};

pub type ProposeCredentialV2 = MsgParts<ProposeCredentialV2Content, ProposeCredentialV2Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposeCredentialV2Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_preview: CredentialPreviewV2,
    pub formats: Vec<AttachmentFormatSpecifier<ProposeCredentialAttachmentFormatType>>,
    #[serde(rename = "filters~attach")]
    pub filters_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposeCredentialV2Decorators {
    #[builder(default)]
    #[serde(rename = "~thread")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[builder(default)]
    #[serde(rename = "~service")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceDecorator>,
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
pub enum ProposeCredentialAttachmentFormatType {
    #[serde(rename = "anoncreds/credential-filter@v1.0")]
    AnoncredsCredentialFilter1_0,
    #[serde(rename = "hlindy/cred-filter@v2.0")]
    HyperledgerIndyCredentialFilter2_0,
    #[serde(rename = "aries/ld-proof-vc-detail@v1.0")]
    AriesLdProofVcDetail1_0,
}
