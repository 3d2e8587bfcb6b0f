use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::{
        attachment::Attachment, please_ack::PleaseAck, service::ServiceDecorator, thread::Thread,
        timing::Timing,
    },
    msg_parts::MsgParts,
};

pub type PresentationV1 = MsgParts<PresentationV1Content, PresentationV1Decorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct PresentationV1Content {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<Attachment>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct PresentationV1Decorators {
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
            attachment::tests::make_extended_attachment, thread::tests::make_minimal_thread,
        },
        misc::test_utils,
    };

    #[test]
    fn test_minimal_presentation() {
        let content = PresentationV1Content::builder()
            .presentations_attach(vec![make_extended_attachment()])
            .build();

        let decorators = PresentationV1Decorators::builder()
            .thread(make_minimal_thread())
            .build();

        let expected = json!({
            "presentations~attach": content.presentations_attach,
            "~thread": decorators.thread,
        });

        let msg = PresentationV1::builder()
            .id("test".to_owned())
            .content(content)
            .decorators(decorators)
            .build();

        test_utils::test_msg(
            msg,
            "https://didcomm.org/present-proof/1.0/presentation",
            expected,
        );
    }
}
