use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    msg_fields::notification::{AckContent, AckDecorators},
    msg_parts::MsgParts,
};

pub type AckPresentationV2 = MsgParts<AckPresentationV2Content, AckDecorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
#[serde(transparent)]
pub struct AckPresentationV2Content {
    pub inner: AckContent,
}

impl From<AckContent> for AckPresentationV2Content {
    fn from(value: AckContent) -> Self {
        Self { inner: value }
    }
}
