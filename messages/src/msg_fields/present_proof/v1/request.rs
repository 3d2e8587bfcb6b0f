use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{attachment::Attachment, service::ServiceDecorator, thread::Thread, timing::Timing},
    msg_parts::MsgParts,
};

pub type RequestPresentationV1 =
    MsgParts<RequestPresentationV1Content, RequestPresentationV1Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestPresentationV1Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestPresentationV1Decorators {
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

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::{
            attachment::tests::make_extended_attachment, service::tests::make_minimal_service,
        },
        misc::test_utils,
    };

    #[test]
    fn test_minimal_request_proof() {
        let content = RequestPresentationV1Content::builder()
            .request_presentations_attach(vec![make_extended_attachment()])
            .build();

        let decorators = RequestPresentationV1Decorators::default();

        let expected = json!({
            "request_presentations~attach": content.request_presentations_attach,
        });

        let msg = RequestPresentationV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/present-proof/1.0/request-presentation",
            expected,
        );
    }

    #[test]
    fn test_connectionless_request_proof() {
        let content = RequestPresentationV1Content::builder()
            .request_presentations_attach(vec![make_extended_attachment()])
            .build();

        let decorators = RequestPresentationV1Decorators::builder()
            .service(Some(make_minimal_service()))
            .build();

        let expected = json!({
            "request_presentations~attach": content.request_presentations_attach,
            "~service": decorators.service,
        });

        let msg = RequestPresentationV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/present-proof/1.0/request-presentation",
            expected,
        );
    }
}
