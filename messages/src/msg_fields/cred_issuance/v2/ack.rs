use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    msg_fields::notification::{AckContent, AckDecorators},
    msg_parts::MsgParts,
};

pub type AckCredentialV2 = MsgParts<AckCredentialV2Content, AckDecorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
#[serde(transparent)]
pub struct AckCredentialV2Content {
    pub inner: AckContent,
}

impl From<AckContent> for AckCredentialV2Content {
    fn from(value: AckContent) -> Self {
        Self { inner: value }
    }
}
