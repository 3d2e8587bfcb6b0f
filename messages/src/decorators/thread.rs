use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Struct representing the `~thread` decorator from its [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/concepts/0008-message-id-and-threading/README.md>).
///
/// Every message of an exchange except the thread-initiating one carries this
/// decorator, with `thid` equal to the `@id` of the initiating message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Thread {
    pub thid: String,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_order: Option<u32>,
}
