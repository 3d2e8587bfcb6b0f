//! Wire-level message model for the credential issuance and proof
//! presentation exchange protocols.
//!
//! Every message is a [`MsgParts`](msg_parts::MsgParts) of protocol-specific
//! content and decorators; [`ExchangeMessage`] is the top-level enum over all
//! of them, with (de)serialization driven by the `@type` envelope field.

pub mod decorators;
pub mod misc;
pub mod msg_fields;
pub mod msg_parts;
pub mod msg_types;

use std::str::FromStr;

use derive_more::From;
use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::{
    msg_fields::{
        cred_issuance::{
            v1::{
                ack::AckCredentialV1, issue_credential::IssueCredentialV1,
                offer_credential::OfferCredentialV1, problem_report::CredIssuanceV1ProblemReport,
                propose_credential::ProposeCredentialV1, request_credential::RequestCredentialV1,
                CredentialIssuanceV1,
            },
            v2::{
                ack::AckCredentialV2, issue_credential::IssueCredentialV2,
                offer_credential::OfferCredentialV2, problem_report::CredIssuanceV2ProblemReport,
                propose_credential::ProposeCredentialV2, request_credential::RequestCredentialV2,
                CredentialIssuanceV2,
            },
            CredentialIssuance,
        },
        present_proof::{
            v1::{
                ack::AckPresentationV1, present::PresentationV1,
                problem_report::PresentProofV1ProblemReport, request::RequestPresentationV1,
                PresentProofV1,
            },
            v2::{
                ack::AckPresentationV2, present::PresentationV2,
                problem_report::PresentProofV2ProblemReport, request::RequestPresentationV2,
                PresentProofV2,
            },
            PresentProof,
        },
    },
    msg_types::{
        CredentialIssuanceTypeV1_0, CredentialIssuanceTypeV2_0, MessageType, PresentProofTypeV1_0,
        PresentProofTypeV2_0, Protocol,
    },
};

/// Any message of any supported protocol family and version.
#[derive(Clone, Debug, From, PartialEq)]
pub enum ExchangeMessage {
    CredentialIssuance(CredentialIssuance),
    PresentProof(PresentProof),
}

macro_rules! impl_from_leaf {
    ($leaf:ty, $outer:ident, $mid:ident, $ver:ident) => {
        impl From<$leaf> for ExchangeMessage {
            fn from(value: $leaf) -> Self {
                Self::$outer($mid::$ver(value.into()))
            }
        }
    };
}

impl_from_leaf!(ProposeCredentialV1, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(OfferCredentialV1, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(RequestCredentialV1, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(IssueCredentialV1, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(AckCredentialV1, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(CredIssuanceV1ProblemReport, CredentialIssuance, CredentialIssuance, V1);
impl_from_leaf!(ProposeCredentialV2, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(OfferCredentialV2, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(RequestCredentialV2, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(IssueCredentialV2, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(AckCredentialV2, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(CredIssuanceV2ProblemReport, CredentialIssuance, CredentialIssuance, V2);
impl_from_leaf!(RequestPresentationV1, PresentProof, PresentProof, V1);
impl_from_leaf!(PresentationV1, PresentProof, PresentProof, V1);
impl_from_leaf!(AckPresentationV1, PresentProof, PresentProof, V1);
impl_from_leaf!(PresentProofV1ProblemReport, PresentProof, PresentProof, V1);
impl_from_leaf!(RequestPresentationV2, PresentProof, PresentProof, V2);
impl_from_leaf!(PresentationV2, PresentProof, PresentProof, V2);
impl_from_leaf!(AckPresentationV2, PresentProof, PresentProof, V2);
impl_from_leaf!(PresentProofV2ProblemReport, PresentProof, PresentProof, V2);

impl ExchangeMessage {
    /// The full `@type` string this message serializes with.
    pub fn msg_type(&self) -> String {
        let (protocol, kind) = self.type_parts();
        format!("{protocol}/{kind}")
    }

    fn type_parts(&self) -> (Protocol, &'static str) {
        use CredentialIssuance as Ci;
        use ExchangeMessage as Em;
        use PresentProof as Pp;

        match self {
            Em::CredentialIssuance(Ci::V1(msg)) => {
                let kind = match msg {
                    CredentialIssuanceV1::ProposeCredential(_) => {
                        CredentialIssuanceTypeV1_0::ProposeCredential
                    }
                    CredentialIssuanceV1::OfferCredential(_) => {
                        CredentialIssuanceTypeV1_0::OfferCredential
                    }
                    CredentialIssuanceV1::RequestCredential(_) => {
                        CredentialIssuanceTypeV1_0::RequestCredential
                    }
                    CredentialIssuanceV1::IssueCredential(_) => {
                        CredentialIssuanceTypeV1_0::IssueCredential
                    }
                    CredentialIssuanceV1::Ack(_) => CredentialIssuanceTypeV1_0::Ack,
                    CredentialIssuanceV1::ProblemReport(_) => {
                        CredentialIssuanceTypeV1_0::ProblemReport
                    }
                };
                (Protocol::CredentialIssuanceV1_0, kind.into())
            }
            Em::CredentialIssuance(Ci::V2(msg)) => {
                let kind = match msg {
                    CredentialIssuanceV2::ProposeCredential(_) => {
                        CredentialIssuanceTypeV2_0::ProposeCredential
                    }
                    CredentialIssuanceV2::OfferCredential(_) => {
                        CredentialIssuanceTypeV2_0::OfferCredential
                    }
                    CredentialIssuanceV2::RequestCredential(_) => {
                        CredentialIssuanceTypeV2_0::RequestCredential
                    }
                    CredentialIssuanceV2::IssueCredential(_) => {
                        CredentialIssuanceTypeV2_0::IssueCredential
                    }
                    CredentialIssuanceV2::Ack(_) => CredentialIssuanceTypeV2_0::Ack,
                    CredentialIssuanceV2::ProblemReport(_) => {
                        CredentialIssuanceTypeV2_0::ProblemReport
                    }
                };
                (Protocol::CredentialIssuanceV2_0, kind.into())
            }
            Em::PresentProof(Pp::V1(msg)) => {
                let kind = match msg {
                    PresentProofV1::RequestPresentation(_) => {
                        PresentProofTypeV1_0::RequestPresentation
                    }
                    PresentProofV1::Presentation(_) => PresentProofTypeV1_0::Presentation,
                    PresentProofV1::Ack(_) => PresentProofTypeV1_0::Ack,
                    PresentProofV1::ProblemReport(_) => PresentProofTypeV1_0::ProblemReport,
                };
                (Protocol::PresentProofV1_0, kind.into())
            }
            Em::PresentProof(Pp::V2(msg)) => {
                let kind = match msg {
                    PresentProofV2::RequestPresentation(_) => {
                        PresentProofTypeV2_0::RequestPresentation
                    }
                    PresentProofV2::Presentation(_) => PresentProofTypeV2_0::Presentation,
                    PresentProofV2::Ack(_) => PresentProofTypeV2_0::Ack,
                    PresentProofV2::ProblemReport(_) => PresentProofTypeV2_0::ProblemReport,
                };
                (Protocol::PresentProofV2_0, kind.into())
            }
        }
    }
}

impl Serialize for ExchangeMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use CredentialIssuance as Ci;
        use ExchangeMessage as Em;
        use PresentProof as Pp;

        let inner = match self {
            Em::CredentialIssuance(Ci::V1(msg)) => match msg {
                CredentialIssuanceV1::ProposeCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV1::OfferCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV1::RequestCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV1::IssueCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV1::Ack(m) => serde_json::to_value(m),
                CredentialIssuanceV1::ProblemReport(m) => serde_json::to_value(m),
            },
            Em::CredentialIssuance(Ci::V2(msg)) => match msg {
                CredentialIssuanceV2::ProposeCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV2::OfferCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV2::RequestCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV2::IssueCredential(m) => serde_json::to_value(m),
                CredentialIssuanceV2::Ack(m) => serde_json::to_value(m),
                CredentialIssuanceV2::ProblemReport(m) => serde_json::to_value(m),
            },
            Em::PresentProof(Pp::V1(msg)) => match msg {
                PresentProofV1::RequestPresentation(m) => serde_json::to_value(m),
                PresentProofV1::Presentation(m) => serde_json::to_value(m),
                PresentProofV1::Ack(m) => serde_json::to_value(m),
                PresentProofV1::ProblemReport(m) => serde_json::to_value(m),
            },
            Em::PresentProof(Pp::V2(msg)) => match msg {
                PresentProofV2::RequestPresentation(m) => serde_json::to_value(m),
                PresentProofV2::Presentation(m) => serde_json::to_value(m),
                PresentProofV2::Ack(m) => serde_json::to_value(m),
                PresentProofV2::ProblemReport(m) => serde_json::to_value(m),
            },
        };

        let mut value = inner.map_err(S::Error::custom)?;
        let obj = value
            .as_object_mut()
            .ok_or_else(|| S::Error::custom("message did not serialize to an object"))?;
        obj.insert("@type".to_owned(), json!(self.msg_type()));

        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExchangeMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let type_str = value
            .get("@type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("message is missing the @type field"))?;

        let msg_type = MessageType::try_from(type_str).map_err(D::Error::custom)?;
        let kind = msg_type.kind.as_str();

        let result = match msg_type.protocol {
            Protocol::CredentialIssuanceV1_0 => {
                match CredentialIssuanceTypeV1_0::from_str(kind).map_err(D::Error::custom)? {
                    CredentialIssuanceTypeV1_0::ProposeCredential => {
                        serde_json::from_value::<ProposeCredentialV1>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV1_0::OfferCredential => {
                        serde_json::from_value::<OfferCredentialV1>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV1_0::RequestCredential => {
                        serde_json::from_value::<RequestCredentialV1>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV1_0::IssueCredential => {
                        serde_json::from_value::<IssueCredentialV1>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV1_0::Ack => {
                        serde_json::from_value::<AckCredentialV1>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV1_0::ProblemReport => {
                        serde_json::from_value::<CredIssuanceV1ProblemReport>(value).map(Self::from)
                    }
                }
            }
            Protocol::CredentialIssuanceV2_0 => {
                match CredentialIssuanceTypeV2_0::from_str(kind).map_err(D::Error::custom)? {
                    CredentialIssuanceTypeV2_0::ProposeCredential => {
                        serde_json::from_value::<ProposeCredentialV2>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV2_0::OfferCredential => {
                        serde_json::from_value::<OfferCredentialV2>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV2_0::RequestCredential => {
                        serde_json::from_value::<RequestCredentialV2>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV2_0::IssueCredential => {
                        serde_json::from_value::<IssueCredentialV2>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV2_0::Ack => {
                        serde_json::from_value::<AckCredentialV2>(value).map(Self::from)
                    }
                    CredentialIssuanceTypeV2_0::ProblemReport => {
                        serde_json::from_value::<CredIssuanceV2ProblemReport>(value).map(Self::from)
                    }
                }
            }
            Protocol::PresentProofV1_0 => {
                match PresentProofTypeV1_0::from_str(kind).map_err(D::Error::custom)? {
                    PresentProofTypeV1_0::RequestPresentation => {
                        serde_json::from_value::<RequestPresentationV1>(value).map(Self::from)
                    }
                    PresentProofTypeV1_0::Presentation => {
                        serde_json::from_value::<PresentationV1>(value).map(Self::from)
                    }
                    PresentProofTypeV1_0::Ack => {
                        serde_json::from_value::<AckPresentationV1>(value).map(Self::from)
                    }
                    PresentProofTypeV1_0::ProblemReport => {
                        serde_json::from_value::<PresentProofV1ProblemReport>(value).map(Self::from)
                    }
                }
            }
            Protocol::PresentProofV2_0 => {
                match PresentProofTypeV2_0::from_str(kind).map_err(D::Error::custom)? {
                    PresentProofTypeV2_0::RequestPresentation => {
                        serde_json::from_value::<RequestPresentationV2>(value).map(Self::from)
                    }
                    PresentProofTypeV2_0::Presentation => {
                        serde_json::from_value::<PresentationV2>(value).map(Self::from)
                    }
                    PresentProofTypeV2_0::Ack => {
                        serde_json::from_value::<AckPresentationV2>(value).map(Self::from)
                    }
                    PresentProofTypeV2_0::ProblemReport => {
                        serde_json::from_value::<PresentProofV2ProblemReport>(value).map(Self::from)
                    }
                }
            }
        };

        result.map_err(D::Error::custom)
    }
}
