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
    ack::AckCredentialV2, issue_credential::IssueCredentialV2, offer_credential::OfferCredentialV2,
    problem_report::CredIssuanceV2ProblemReport, propose_credential::ProposeCredentialV2,
    request_credential::RequestCredentialV2,
};
use super::CredentialAttr;

#[derive(Clone, Debug, From, PartialEq)]
pub enum CredentialIssuanceV2 {
    ProposeCredential(ProposeCredentialV2),
    OfferCredential(OfferCredentialV2),
    RequestCredential(RequestCredentialV2),
    IssueCredential(IssueCredentialV2),
    Ack(AckCredentialV2),
    ProblemReport(CredIssuanceV2ProblemReport),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct CredentialPreviewV2 {
    #[builder(default)]
    #[serde(rename = "@type")]
    msg_type: CredentialPreviewV2MsgType,
    pub attributes: Vec<CredentialAttr>,
}

impl CredentialPreviewV2 {
    pub fn new(attributes: Vec<CredentialAttr>) -> Self {
        Self {
            msg_type: CredentialPreviewV2MsgType,
            attributes,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CredentialPreviewV2MsgType;

const PREVIEW_V2_TYPE: &str = "https://didcomm.org/issue-credential/2.0/credential-preview";

impl Serialize for CredentialPreviewV2MsgType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(PREVIEW_V2_TYPE)
    }
}

impl<'de> Deserialize<'de> for CredentialPreviewV2MsgType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value == PREVIEW_V2_TYPE {
            Ok(Self)
        } else {
            Err(D::Error::custom(format!(
                "invalid credential preview type: {value}"
            )))
        }
    }
}
