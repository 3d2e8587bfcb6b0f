use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A complete protocol message: its `@id`, the protocol-specific content and
/// the decorators it carries.
///
/// The `@type` field is not stored here; it is derived from the concrete
/// message type when the message is wrapped into
/// [`ExchangeMessage`](crate::ExchangeMessage) for serialization.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct MsgParts<C, D> {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(flatten)]
    pub content: C,
    #[serde(flatten)]
    pub decorators: D,
}
