use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use crate::misc::{utils, MaybeKnown, MimeType};

/// Struct representing the `~attach` decorator from its [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/concepts/0017-attachments/README.md>).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Attachment {
    #[builder(default)]
    #[serde(rename = "@id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[builder(default)]
    #[serde(rename = "mime-type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MaybeKnown<MimeType>>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "utils::serialize_opt_datetime")]
    pub lastmod_time: Option<DateTime<Utc>>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_count: Option<u64>,
    pub data: AttachmentData,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct AttachmentData {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub content: AttachmentType,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Base64(String),
    Json(Value),
    Links(Vec<Url>),
}

#[cfg(test)]
pub mod tests {
    use serde_json::json;

    use super::*;
    use crate::misc::test_utils;

    pub fn make_minimal_attachment() -> Attachment {
        let data = AttachmentData::builder()
            .content(AttachmentType::Json(json!({ "field": "test_json_data" })))
            .build();
        Attachment::builder().data(data).build()
    }

    pub fn make_extended_attachment() -> Attachment {
        let data = AttachmentData::builder()
            .content(AttachmentType::Base64("dGVzdA==".to_owned()))
            .build();

        Attachment::builder()
            .id(Some("1".to_owned()))
            .description(Some("test_description".to_owned()))
            .mime_type(Some(MaybeKnown::Known(MimeType::Json)))
            .byte_count(Some(64))
            .data(data)
            .build()
    }

    #[test]
    fn test_minimal_attachment() {
        let attachment = make_minimal_attachment();
        let expected = json!({
            "data": {
                "json": { "field": "test_json_data" }
            }
        });

        test_utils::test_serde(attachment, expected);
    }

    #[test]
    fn test_extended_attachment() {
        let attachment = make_extended_attachment();
        let expected = json!({
            "@id": "1",
            "description": "test_description",
            "mime-type": "application/json",
            "byte_count": 64,
            "data": {
                "base64": "dGVzdA=="
            }
        });

        test_utils::test_serde(attachment, expected);
    }
}
