pub mod cred_issuance;
pub mod present_proof;
pub mod registry;

use std::fmt;

pub use cred_issuance::{CredentialIssuanceTypeV1_0, CredentialIssuanceTypeV2_0};
pub use present_proof::{PresentProofTypeV1_0, PresentProofTypeV2_0};

/// Prefix under which all supported protocols are namespaced.
pub const DID_COM_ORG_PREFIX: &str = "https://didcomm.org";

/// A supported `(protocol family, major.minor version)` pair.
///
/// The `@type` field of every message resolves to one of these plus a
/// family-specific message kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    CredentialIssuanceV1_0,
    CredentialIssuanceV2_0,
    PresentProofV1_0,
    PresentProofV2_0,
}

impl Protocol {
    /// Protocol name, major and minor version, as they appear in the *pid*.
    pub fn as_parts(self) -> (&'static str, u8, u8) {
        match self {
            Self::CredentialIssuanceV1_0 => ("issue-credential", 1, 0),
            Self::CredentialIssuanceV2_0 => ("issue-credential", 2, 0),
            Self::PresentProofV1_0 => ("present-proof", 1, 0),
            Self::PresentProofV2_0 => ("present-proof", 2, 0),
        }
    }

    pub fn from_parts(name: &str, major: u8, minor: u8) -> Option<Self> {
        match (name, major, minor) {
            ("issue-credential", 1, 0) => Some(Self::CredentialIssuanceV1_0),
            ("issue-credential", 2, 0) => Some(Self::CredentialIssuanceV2_0),
            ("present-proof", 1, 0) => Some(Self::PresentProofV1_0),
            ("present-proof", 2, 0) => Some(Self::PresentProofV2_0),
        _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, major, minor) = self.as_parts();
        write!(f, "{DID_COM_ORG_PREFIX}/{name}/{major}.{minor}")
    }
}

/// A fully parsed `@type` field: the protocol and the message kind within it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageType {
    pub protocol: Protocol,
    pub kind: String,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.kind)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid message type: {0}")]
pub struct MsgTypeError(pub String);

impl MsgTypeError {
    fn new(msg_type: &str) -> Self {
        Self(msg_type.to_owned())
    }
}

impl TryFrom<&str> for MessageType {
    type Error = MsgTypeError;

    /// Parses e.g. `https://didcomm.org/issue-credential/1.0/offer-credential`.
    ///
    /// The minor version is resolved against the protocol registry, so a
    /// message declaring a higher minor of a supported major (e.g. `1.1`) is
    /// accepted as the highest supported minor below it.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let err = || MsgTypeError::new(s);

        let rest = s.strip_prefix(DID_COM_ORG_PREFIX).ok_or_else(err)?;
        let rest = rest.strip_prefix('/').ok_or_else(err)?;

        let mut iter = rest.split('/');
        let name = iter.next().ok_or_else(err)?;
        let version = iter.next().ok_or_else(err)?;
        let kind = iter.next().ok_or_else(err)?;
        if iter.next().is_some() || kind.is_empty() {
            return Err(err());
        }

        let (major, minor) = version.split_once('.').ok_or_else(err)?;
        let major = major.parse::<u8>().map_err(|_| err())?;
        let minor = minor.parse::<u8>().map_err(|_| err())?;

        let minor = registry::get_supported_version(name, major, minor).ok_or_else(err)?;
        let protocol = Protocol::from_parts(name, major, minor).ok_or_else(err)?;

        Ok(MessageType {
            protocol,
            kind: kind.to_owned(),
        })
    }
}
