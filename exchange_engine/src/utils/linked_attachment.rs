//! Linked attachments: binary payloads bound to credential preview
//! attributes by a content-addressed locator.
//!
//! The attribute value is rewritten to `hl:` + base58(sha256(bytes)) and the
//! payload rides along as a sibling attachment whose `@id` is the locator, so
//! either side can re-derive the hash and check the binding.

use base64::{engine::general_purpose::STANDARD, Engine};
use messages::{
    decorators::attachment::{Attachment, AttachmentData, AttachmentType},
    misc::{MaybeKnown, MimeType},
    msg_fields::cred_issuance::CredentialAttr,
};
use sha2::{Digest, Sha256};

use crate::errors::error::prelude::*;

#[derive(Clone, Debug)]
pub struct LinkedAttachment {
    pub attribute_name: String,
    pub mime_type: MimeType,
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn hashlink(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("hl:{}", bs58::encode(digest).into_string())
}

/// Rewrite the matching preview attributes to their locators and return the
/// attachments to append to the carrying message.
pub fn apply_linked_attachments(
    attributes: &mut [CredentialAttr],
    linked: &[LinkedAttachment],
) -> EngineResult<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(linked.len());
    for link in linked {
        let attribute = attributes
            .iter_mut()
            .find(|a| a.name == link.attribute_name)
            .ok_or_else(|| {
                EngineError::from_msg(
                    EngineErrorKind::InvalidInput,
                    format!(
                        "linked attachment references unknown attribute {}",
                        link.attribute_name
                    ),
                )
            })?;

        let locator = hashlink(&link.bytes);
        attribute.value = locator.clone();
        attribute.mime_type = Some(link.mime_type);

        let data = AttachmentData::builder()
            .content(AttachmentType::Base64(STANDARD.encode(&link.bytes)))
            .build();
        attachments.push(
            Attachment::builder()
                .id(Some(locator))
                .filename(link.filename.clone())
                .mime_type(Some(MaybeKnown::Known(link.mime_type)))
                .data(data)
                .build(),
        );
    }
    Ok(attachments)
}

/// Decode a linked attachment and check the bytes against its locator.
pub fn linked_attachment_bytes(attachment: &Attachment) -> EngineResult<Vec<u8>> {
    let locator = attachment.id.as_deref().ok_or_else(|| {
        EngineError::from_msg(EngineErrorKind::InvalidAttachment, "linked attachment has no id")
    })?;
    let AttachmentType::Base64(encoded) = &attachment.data.content else {
        return Err(EngineError::from_msg(
            EngineErrorKind::InvalidAttachment,
            "linked attachment is not base64 encoded",
        ));
    };
    let bytes = STANDARD.decode(encoded).map_err(|err| {
        EngineError::from_msg(
            EngineErrorKind::InvalidAttachment,
            format!("linked attachment is not valid base64: {err}"),
        )
    })?;
    if hashlink(&bytes) != locator {
        return Err(EngineError::from_msg(
            EngineErrorKind::InvalidAttachment,
            format!("linked attachment bytes do not hash to locator {locator}"),
        ));
    }
    Ok(bytes)
}
