use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{attachment::Attachment, service::ServiceDecorator, thread::Thread, timing::Timing},
    msg_fields::common::AttachmentFormatSpecifier,
    msg_parts::MsgParts,
};

pub type RequestPresentationV2 =
    MsgParts<RequestPresentationV2Content, RequestPresentationV2Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestPresentationV2Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub will_confirm: Option<bool>,
    pub formats: Vec<AttachmentFormatSpecifier<RequestPresentationAttachmentFormatType>>,
    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestPresentationV2Decorators {
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
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub enum RequestPresentationAttachmentFormatType {
    #[serde(rename = "anoncreds/proof-request@v1.0")]
    AnoncredsProofRequest1_0,
    #[serde(rename = "hlindy/proof-req@v2.0")]
    HyperledgerIndyProofRequest2_0,
    #[serde(rename = "dif/presentation-exchange/definitions@v1.0")]
    DifPresentationExchangeDefinitions1_0,
}
