//! Messages of the `issue-credential` protocol, both versions, as defined in
//! the [v1 RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0036-issue-credential/README.md>)
//! and the [v2 RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0453-issue-credential-v2/README.md>).

pub mod v1;
pub mod v2;

use derive_more::From;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::misc::MimeType;

use self::{v1::CredentialIssuanceV1, v2::CredentialIssuanceV2};

#[derive(Clone, Debug, From, PartialEq)]
pub enum CredentialIssuance {
    V1(CredentialIssuanceV1),
    V2(CredentialIssuanceV2),
}

/// A single attribute of a credential preview.
///
/// When the attribute references a linked attachment, `value` holds the
/// content-addressed locator of the attachment rather than an inline value.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct CredentialAttr {
    pub name: String,
    #[builder(default)]
    #[serde(rename = "mime-type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
    pub value: String,
}
