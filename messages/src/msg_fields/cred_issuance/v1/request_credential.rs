use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{attachment::Attachment, service::ServiceDecorator, thread::Thread, timing::Timing},
    msg_parts::MsgParts,
};

pub type RequestCredentialV1 = MsgParts<RequestCredentialV1Content, RequestCredentialV1Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestCredentialV1Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "requests~attach")]
    pub requests_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct RequestCredentialV1Decorators {
    #[serde(rename = "~thread")]
    pub thread: Thread,
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
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::{
            attachment::tests::make_extended_attachment, thread::tests::make_minimal_thread,
        },
        misc::test_utils,
    };

    #[test]
    fn test_minimal_request_cred() {
        let content = RequestCredentialV1Content::builder()
            .requests_attach(vec![make_extended_attachment()])
            .build();

        let decorators = RequestCredentialV1Decorators::builder()
            .thread(make_minimal_thread())
            .build();

        let expected = json!({
            "requests~attach": content.requests_attach,
            "~thread": decorators.thread,
        });

        let msg = RequestCredentialV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/1.0/request-credential",
            expected,
        );
    }
}
