pub mod ack;
pub mod issue_credential;
pub mod offer_credential;
pub mod problem_report;
pub mod propose_credential;
pub mod request_credential;

use derive_more::From;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

use self::{
    ack::AckCredentialV1, issue_credential::IssueCredentialV1, offer_credential::OfferCredentialV1,
    problem_report::CredIssuanceV1ProblemReport, propose_credential::ProposeCredentialV1,
    request_credential::RequestCredentialV1,
};
use super::CredentialAttr;

#[derive(Clone, Debug, From, PartialEq)]
pub enum CredentialIssuanceV1 {
    ProposeCredential(ProposeCredentialV1),
    OfferCredential(OfferCredentialV1),
    RequestCredential(RequestCredentialV1),
    IssueCredential(IssueCredentialV1),
    Ack(AckCredentialV1),
    ProblemReport(CredIssuanceV1ProblemReport),
}

/// The preview of the credential under negotiation, carried by proposals and
/// offers. It serializes with its own `@type` marker.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct CredentialPreviewV1 {
    #[builder(default)]
    #[serde(rename = "@type")]
    msg_type: CredentialPreviewV1MsgType,
    pub attributes: Vec<CredentialAttr>,
}

impl CredentialPreviewV1 {
    pub fn new(attributes: Vec<CredentialAttr>) -> Self {
        Self {
            msg_type: CredentialPreviewV1MsgType,
            attributes,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CredentialPreviewV1MsgType;

const PREVIEW_V1_TYPE: &str = "https://didcomm.org/issue-credential/1.0/credential-preview";

impl Serialize for CredentialPreviewV1MsgType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(PREVIEW_V1_TYPE)
    }
}

impl<'de> Deserialize<'de> for CredentialPreviewV1MsgType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value == PREVIEW_V1_TYPE {
            Ok(Self)
        } else {
            Err(D::Error::custom(format!(
                "invalid credential preview type: {value}"
            )))
        }
    }
}
