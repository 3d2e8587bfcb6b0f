//! Hyperledger Indy style attachment format: base64 JSON payloads and a
//! revealed-attribute / predicate model for presentations.

use std::collections::HashMap;

use async_trait::async_trait;
use messages::decorators::attachment::Attachment;
use serde_json::{json, Map, Value};

use super::AttachmentFormat;
use crate::{
    errors::error::prelude::*,
    utils::attachment::{attachment_payload, make_attachment},
};

pub const CRED_FILTER: &str = "hlindy/cred-filter@v2.0";
pub const CRED_ABSTRACT: &str = "hlindy/cred-abstract@v2.0";
pub const CRED_REQ: &str = "hlindy/cred-req@v2.0";
pub const CRED: &str = "hlindy/cred@v2.0";
pub const PROOF_REQ: &str = "hlindy/proof-req@v2.0";
pub const PROOF: &str = "hlindy/proof@v2.0";

const SUPPORTED: &[&str] = &[CRED_FILTER, CRED_ABSTRACT, CRED_REQ, CRED, PROOF_REQ, PROOF];

/// The indy-style plugin. `credential_values` holds the attribute values the
/// agent can reveal when answering proof requests.
#[derive(Default)]
pub struct HyperledgerIndyFormat {
    credential_values: HashMap<String, Value>,
}

impl HyperledgerIndyFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential_values(credential_values: HashMap<String, Value>) -> Self {
        Self { credential_values }
    }

    fn attribute_value(&self, name: &str) -> EngineResult<&Value> {
        self.credential_values.get(name).ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::InvalidState,
                format!("no credential value held for attribute {name}"),
            )
        })
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn predicate_holds(p_type: &str, actual: i64, bound: i64) -> bool {
    match p_type {
        ">=" => actual >= bound,
        ">" => actual > bound,
        "<=" => actual <= bound,
        "<" => actual < bound,
        _ => false,
    }
}

fn object(value: &Value, field: &str) -> Map<String, Value> {
    value
        .get(field)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl AttachmentFormat for HyperledgerIndyFormat {
    fn supports_format(&self, format: &str) -> bool {
        SUPPORTED.contains(&format)
    }

    async fn create_attachment(
        &self,
        payload: &Value,
        attach_id: String,
    ) -> EngineResult<Attachment> {
        make_attachment(payload, attach_id)
    }

    async fn process_attachment(&self, attachment: &Attachment) -> EngineResult<Value> {
        attachment_payload(attachment)
    }

    async fn create_presentation_payload(&self, request: &Value) -> EngineResult<Value> {
        let mut revealed_attrs = Map::new();
        for (referent, requested) in object(request, "requested_attributes") {
            let name = requested
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EngineError::from_msg(
                        EngineErrorKind::InvalidJson,
                        format!("requested attribute {referent} has no name"),
                    )
                })?;
            let value = self.attribute_value(name)?;
            revealed_attrs.insert(referent, json!({ "name": name, "value": value }));
        }

        let mut predicates = Map::new();
        for (referent, requested) in object(request, "requested_predicates") {
            let name = requested
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EngineError::from_msg(
                        EngineErrorKind::InvalidJson,
                        format!("requested predicate {referent} has no name"),
                    )
                })?;
            let actual = as_i64(self.attribute_value(name)?).ok_or_else(|| {
                EngineError::from_msg(
                    EngineErrorKind::InvalidState,
                    format!("attribute {name} is not numeric, cannot prove a predicate over it"),
                )
            })?;
            predicates.insert(
                referent,
                json!({
                    "name": name,
                    "p_type": requested.get("p_type").cloned().unwrap_or(Value::Null),
                    "p_value": requested.get("p_value").cloned().unwrap_or(Value::Null),
                    "value": actual,
                }),
            );
        }

        Ok(json!({
            "revealed_attrs": revealed_attrs,
            "predicates": predicates,
        }))
    }

    async fn verify_presentation(
        &self,
        request: &Value,
        presentation: &Value,
    ) -> EngineResult<bool> {
        let revealed = object(presentation, "revealed_attrs");
        for (referent, requested) in object(request, "requested_attributes") {
            let Some(attr) = revealed.get(&referent) else {
                return Ok(false);
            };
            if attr.get("name") != requested.get("name") {
                return Ok(false);
            }
            match attr.get("value") {
                Some(Value::Null) | None => return Ok(false),
                _ => {}
            }
        }

        let proved = object(presentation, "predicates");
        for (referent, requested) in object(request, "requested_predicates") {
            let Some(predicate) = proved.get(&referent) else {
                return Ok(false);
            };
            if predicate.get("name") != requested.get("name")
                || predicate.get("p_type") != requested.get("p_type")
                || predicate.get("p_value") != requested.get("p_value")
            {
                return Ok(false);
            }
            let (Some(p_type), Some(bound), Some(actual)) = (
                requested.get("p_type").and_then(Value::as_str),
                requested.get("p_value").and_then(as_i64),
                predicate.get("value").and_then(as_i64),
            ) else {
                return Ok(false);
            };
            if !predicate_holds(p_type, actual, bound) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder() -> HyperledgerIndyFormat {
        HyperledgerIndyFormat::with_credential_values(HashMap::from([
            ("name".to_owned(), json!("John")),
            ("age".to_owned(), json!("99")),
        ]))
    }

    fn proof_request() -> Value {
        json!({
            "name": "proof-request",
            "version": "1.0",
            "requested_attributes": {
                "attribute_0": { "name": "name", "restrictions": { "cred_def_id": "dummy" } }
            },
            "requested_predicates": {
                "predicate_0": { "name": "age", "p_type": ">=", "p_value": 50 }
            }
        })
    }

    #[tokio::test]
    async fn test_presentation_satisfies_request() {
        let format = holder();
        let presentation = format
            .create_presentation_payload(&proof_request())
            .await
            .unwrap();

        assert_eq!(
            presentation["revealed_attrs"]["attribute_0"]["value"],
            json!("John")
        );
        assert_eq!(presentation["predicates"]["predicate_0"]["value"], json!(99));
        assert!(format
            .verify_presentation(&proof_request(), &presentation)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_failed_predicate_is_not_verified() {
        let format = HyperledgerIndyFormat::with_credential_values(HashMap::from([
            ("name".to_owned(), json!("John")),
            ("age".to_owned(), json!("30")),
        ]));
        let presentation = format
            .create_presentation_payload(&proof_request())
            .await
            .unwrap();

        assert!(!format
            .verify_presentation(&proof_request(), &presentation)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_revealed_attribute_is_not_verified() {
        let format = holder();
        let presentation = json!({ "revealed_attrs": {}, "predicates": {} });
        assert!(!format
            .verify_presentation(&proof_request(), &presentation)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_holder_without_values_cannot_present() {
        let format = HyperledgerIndyFormat::new();
        let err = format
            .create_presentation_payload(&proof_request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::InvalidState);
    }
}
