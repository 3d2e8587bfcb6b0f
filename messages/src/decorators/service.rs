use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

/// Struct representing the `~service` decorator from its [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0056-service-decorator/README.md>).
///
/// Carried by messages of connection-less exchanges instead of relying on an
/// established connection: the receiver replies to `service_endpoint`,
/// encrypting for the first of `recipient_keys`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDecorator {
    pub recipient_keys: Vec<String>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<String>,
    pub service_endpoint: Url,
}
