use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::CredentialPreviewV1;
use crate::{
    decorators::{
        attachment::Attachment, service::ServiceDecorator, thread::Thread, timing::Timing,
    },
    msg_parts::MsgParts,
};

pub type ProposeCredentialV1 = MsgParts<ProposeCredentialV1Content, ProposeCredentialV1Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposeCredentialV1Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_proposal: CredentialPreviewV1,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProposeCredentialV1Decorators {
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

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::thread::tests::make_extended_thread,
        misc::test_utils,
        msg_fields::cred_issuance::CredentialAttr,
    };

    #[test]
    fn test_minimal_propose_cred() {
        let attribute = CredentialAttr::builder()
            .name("test_attribute_name".to_owned())
            .value("test_attribute_value".to_owned())
            .build();

        let content = ProposeCredentialV1Content::builder()
            .credential_proposal(CredentialPreviewV1::new(vec![attribute]))
            .build();

        let decorators = ProposeCredentialV1Decorators::default();

        let expected = json!({
            "credential_proposal": content.credential_proposal,
        });

        let msg = ProposeCredentialV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/1.0/propose-credential",
            expected,
        );
    }

    #[test]
    fn test_extended_propose_cred() {
        let attribute = CredentialAttr::builder()
            .name("test_attribute_name".to_owned())
            .value("test_attribute_value".to_owned())
            .build();

        let content = ProposeCredentialV1Content::builder()
            .credential_proposal(CredentialPreviewV1::new(vec![attribute]))
            .comment(Some("test_comment".to_owned()))
            .cred_def_id(Some("test_cred_def_id".to_owned()))
            .build();

        let decorators = ProposeCredentialV1Decorators::builder()
            .thread(Some(make_extended_thread()))
            .build();

        let expected = json!({
            "credential_proposal": content.credential_proposal,
            "comment": content.comment,
            "cred_def_id": content.cred_def_id,
            "~thread": decorators.thread,
        });

        let msg = ProposeCredentialV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/1.0/propose-credential",
            expected,
        );
    }
}
