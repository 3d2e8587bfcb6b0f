//! Proof presentation services, one per protocol version.

pub mod v1;
pub mod v2;

use messages::decorators::service::ServiceDecorator;
use serde_json::{json, Value};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::autoaccept::AutoAcceptPolicy;

/// Caller input for a presentation request.
#[derive(Clone, Debug, TypedBuilder)]
pub struct PresentationRequestData {
    pub name: String,
    /// Requested attributes keyed by referent, each
    /// `{ "name": ..., "restrictions": ... }`.
    #[builder(default = json!({}))]
    pub requested_attributes: Value,
    /// Requested predicates keyed by referent, each
    /// `{ "name": ..., "p_type": ">=", "p_value": ... }`.
    #[builder(default = json!({}))]
    pub requested_predicates: Value,
    #[builder(default)]
    pub comment: Option<String>,
    #[builder(default)]
    pub auto_accept: Option<AutoAcceptPolicy>,
    /// Set for connection-less requests: the `~service` block replies should
    /// be addressed to.
    #[builder(default)]
    pub service: Option<ServiceDecorator>,
    /// Attachment format identifier to request; versions that do not
    /// negotiate formats ignore it.
    #[builder(default)]
    pub format: Option<String>,
}

pub(crate) fn request_payload(data: &PresentationRequestData) -> Value {
    json!({
        "name": data.name,
        "version": "1.0",
        "nonce": Uuid::new_v4().simple().to_string(),
        "requested_attributes": data.requested_attributes,
        "requested_predicates": data.requested_predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_shape() {
        let data = PresentationRequestData::builder()
            .name("proof-request".to_owned())
            .requested_attributes(json!({
                "attribute_0": { "name": "name" }
            }))
            .build();
        let payload = request_payload(&data);

        assert_eq!(payload["name"], json!("proof-request"));
        assert_eq!(payload["requested_attributes"]["attribute_0"]["name"], json!("name"));
        assert_eq!(payload["requested_predicates"], json!({}));
        assert!(payload["nonce"].as_str().is_some());
    }
}
