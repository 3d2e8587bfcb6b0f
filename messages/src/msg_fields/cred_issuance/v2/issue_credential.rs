use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{
        attachment::Attachment, please_ack::PleaseAck, service::ServiceDecorator, thread::Thread,
        timing::Timing,
    },
    msg_fields::common::AttachmentFormatSpecifier,
    msg_parts::MsgParts,
};

pub type IssueCredentialV2 = MsgParts<IssueCredentialV2Content, IssueCredentialV2Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct IssueCredentialV2Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub formats: Vec<AttachmentFormatSpecifier<IssueCredentialAttachmentFormatType>>,
    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct IssueCredentialV2Decorators {
    #[serde(rename = "~thread")]
    pub thread: Thread,
    #[builder(default)]
    #[serde(rename = "~please_ack")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub please_ack: Option<PleaseAck>,
    #[builder(default)]
    #[serde(rename = "~service")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceDecorator>,
    #[builder(default)]
    #[serde(rename = "~timing")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub enum IssueCredentialAttachmentFormatType {
    #[serde(rename = "anoncreds/credential@v1.0")]
    AnoncredsCredential1_0,
    #[serde(rename = "hlindy/cred@v2.0")]
    HyperledgerIndyCredential2_0,
    #[serde(rename = "aries/ld-proof-vc@v1.0")]
    AriesLdProofVc1_0,
}
