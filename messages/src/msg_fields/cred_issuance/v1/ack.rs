use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    msg_fields::notification::{AckContent, AckDecorators},
    msg_parts::MsgParts,
};

pub type AckCredentialV1 = MsgParts<AckCredentialV1Content, AckDecorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
#[serde(transparent)]
pub struct AckCredentialV1Content {
    pub inner: AckContent,
}

impl From<AckContent> for AckCredentialV1Content {
    fn from(value: AckContent) -> Self {
        Self { inner: value }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decorators::thread::tests::make_extended_thread,
        misc::test_utils,
        msg_fields::notification::AckStatus,
    };

    #[test]
    fn test_minimal_ack_cred() {
        let content: AckCredentialV1Content = AckContent::builder().status(AckStatus::Ok).build().into();

        let decorators = AckDecorators::builder()
            .thread(make_extended_thread())
            .build();

        let expected = json!({
            "status": content.inner.status,
            "~thread": decorators.thread
        });

        let msg = AckCredentialV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/issue-credential/1.0/ack",
            expected,
        );
    }
}
