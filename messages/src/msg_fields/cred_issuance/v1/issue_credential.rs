use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{
        attachment::Attachment, please_ack::PleaseAck, service::ServiceDecorator, thread::Thread,
        timing::Timing,
    },
    msg_parts::MsgParts,
};

pub type IssueCredentialV1 = MsgParts<IssueCredentialV1Content, IssueCredentialV1Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct IssueCredentialV1Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct IssueCredentialV1Decorators {
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::{
            attachment::tests::make_extended_attachment,
            please_ack::tests::make_minimal_please_ack, thread::tests::make_minimal_thread,
        },
        misc::test_utils,
    };

    #[test]
    fn test_extended_issue_cred() {
        let content = IssueCredentialV1Content::builder()
            .credentials_attach(vec![make_extended_attachment()])
            .comment(Some("test_comment".to_owned()))
            .build();

        let decorators = IssueCredentialV1Decorators::builder()
            .thread(make_minimal_thread())
            .please_ack(Some(make_minimal_please_ack()))
            .build();

        let expected = json!({
            "credentials~attach": content.credentials_attach,
            "comment": content.comment,
            "~thread": decorators.thread,
            "~please_ack": decorators.please_ack,
        });

        let msg = IssueCredentialV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/1.0/issue-credential",
            expected,
        );
    }
}
