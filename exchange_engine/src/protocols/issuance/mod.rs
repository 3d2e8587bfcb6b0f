//! Credential issuance services, one per protocol version.

pub mod v1;
pub mod v2;

use messages::{
    misc::MaybeKnown,
    msg_fields::{common::AttachmentFormatSpecifier, cred_issuance::CredentialAttr},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use typed_builder::TypedBuilder;

use crate::{autoaccept::AutoAcceptPolicy, utils::linked_attachment::LinkedAttachment};

/// Caller input for a credential proposal.
#[derive(Clone, Debug, TypedBuilder)]
pub struct CredentialProposalData {
    pub attributes: Vec<CredentialAttr>,
    #[builder(default)]
    pub schema_id: Option<String>,
    #[builder(default)]
    pub cred_def_id: Option<String>,
    #[builder(default)]
    pub comment: Option<String>,
    #[builder(default)]
    pub linked_attachments: Vec<LinkedAttachment>,
    #[builder(default)]
    pub auto_accept: Option<AutoAcceptPolicy>,
}

/// Caller input for a credential offer.
#[derive(Clone, Debug, TypedBuilder)]
pub struct CredentialOfferData {
    pub attributes: Vec<CredentialAttr>,
    #[builder(default)]
    pub comment: Option<String>,
    #[builder(default)]
    pub linked_attachments: Vec<LinkedAttachment>,
    #[builder(default)]
    pub auto_accept: Option<AutoAcceptPolicy>,
    /// Attachment format identifier to offer; versions that do not negotiate
    /// formats ignore it.
    #[builder(default)]
    pub format: Option<String>,
}

/// The attachment payload an offer (and later the credential) carries: the
/// preview attributes as a plain values map.
pub(crate) fn values_payload(attributes: &[CredentialAttr]) -> Value {
    let values: Map<String, Value> = attributes
        .iter()
        .map(|a| (a.name.clone(), Value::String(a.value.clone())))
        .collect();
    json!({ "values": values })
}

/// Build a typed format specifier from a raw format identifier.
pub(crate) fn format_specifier<F: DeserializeOwned>(
    attach_id: String,
    format: &str,
) -> AttachmentFormatSpecifier<F> {
    let format = serde_json::from_value::<MaybeKnown<F>>(Value::String(format.to_owned()))
        .unwrap_or_else(|_| MaybeKnown::Unknown(format.to_owned()));
    AttachmentFormatSpecifier::builder()
        .attach_id(attach_id)
        .format(format)
        .build()
}
