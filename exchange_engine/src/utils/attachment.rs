//! Helpers for building and decoding base64 JSON attachments.

use base64::{engine::general_purpose::STANDARD, Engine};
use messages::{
    decorators::attachment::{Attachment, AttachmentData, AttachmentType},
    misc::{MaybeKnown, MimeType},
};
use serde_json::Value;

use crate::errors::error::prelude::*;

/// Wrap a JSON payload into a base64 attachment under the given id.
pub fn make_attachment(payload: &Value, id: String) -> EngineResult<Attachment> {
    let json = serde_json::to_string(payload).map_err(|err| {
        EngineError::from_msg(
            EngineErrorKind::SerializationError,
            format!("failed to serialize attachment payload: {err}"),
        )
    })?;
    let data = AttachmentData::builder()
        .content(AttachmentType::Base64(STANDARD.encode(json)))
        .build();
    Ok(Attachment::builder()
        .id(Some(id))
        .mime_type(Some(MaybeKnown::Known(MimeType::Json)))
        .data(data)
        .build())
}

/// Decode an attachment back into its JSON payload. Both base64 and inline
/// JSON encodings are accepted.
pub fn attachment_payload(attachment: &Attachment) -> EngineResult<Value> {
    match &attachment.data.content {
        AttachmentType::Json(value) => Ok(value.clone()),
        AttachmentType::Base64(encoded) => {
            let bytes = STANDARD.decode(encoded).map_err(|err| {
                EngineError::from_msg(
                    EngineErrorKind::InvalidAttachment,
                    format!("attachment is not valid base64: {err}"),
                )
            })?;
            serde_json::from_slice(&bytes).map_err(|err| {
                EngineError::from_msg(
                    EngineErrorKind::InvalidAttachment,
                    format!("attachment is not base64 encoded JSON: {err}"),
                )
            })
        }
        AttachmentType::Links(_) => Err(EngineError::from_msg(
            EngineErrorKind::InvalidAttachment,
            "link attachments carry no inline payload",
        )),
    }
}

/// Find the attachment with the given `@id` in a message's attachment list.
pub fn find_attachment<'a>(attachments: &'a [Attachment], id: &str) -> EngineResult<&'a Attachment> {
    attachments
        .iter()
        .find(|a| a.id.as_deref() == Some(id))
        .ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::InvalidAttachment,
                format!("no attachment with id {id}"),
            )
        })
}

/// The payload of the first attachment; errors when the list is empty.
pub fn first_attachment_payload(attachments: &[Attachment]) -> EngineResult<Value> {
    let attachment = attachments.first().ok_or_else(|| {
        EngineError::from_msg(EngineErrorKind::InvalidAttachment, "message has no attachment")
    })?;
    attachment_payload(attachment)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = json!({ "values": { "name": "John", "age": "99" } });
        let attachment = make_attachment(&payload, "attach-0".to_owned()).unwrap();

        assert_eq!(attachment.id.as_deref(), Some("attach-0"));
        assert!(matches!(attachment.data.content, AttachmentType::Base64(_)));
        assert_eq!(attachment_payload(&attachment).unwrap(), payload);
    }

    #[test]
    fn test_inline_json_payload() {
        let data = AttachmentData::builder()
            .content(AttachmentType::Json(json!({ "a": 1 })))
            .build();
        let attachment = Attachment::builder().data(data).build();
        assert_eq!(attachment_payload(&attachment).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn test_garbage_base64_is_an_error() {
        let data = AttachmentData::builder()
            .content(AttachmentType::Base64("not-base64!!!".to_owned()))
            .build();
        let attachment = Attachment::builder().data(data).build();
        let err = attachment_payload(&attachment).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::InvalidAttachment);
    }

    #[test]
    fn test_missing_attachment() {
        let err = first_attachment_payload(&[]).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::InvalidAttachment);
    }
}
