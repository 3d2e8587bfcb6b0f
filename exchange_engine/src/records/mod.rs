//! Exchange records: the durable state of one protocol exchange with one
//! counterparty, correlated by thread id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, IntoStaticStr};

use crate::autoaccept::AutoAcceptPolicy;

/// Major protocol version of the exchange. Minor versions are resolved at the
/// message type boundary and do not appear on records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
pub enum ProtocolVersion {
    #[strum(serialize = "1.0")]
    V1,
    #[strum(serialize = "2.0")]
    V2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialRole {
    Holder,
    Issuer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofRole {
    Prover,
    Verifier,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CredentialState {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    Done,
    Declined,
    Abandoned,
}

impl CredentialState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Declined | Self::Abandoned)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ProofState {
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Done,
    Declined,
    Abandoned,
}

impl ProofState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Declined | Self::Abandoned)
    }
}

/// Common record accessors used by the stores for tag queries.
pub trait ExchangeRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn thread_id(&self) -> &str;
    fn connection_id(&self) -> Option<&str>;
    fn state_tag(&self) -> &'static str;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialExchangeRecord {
    pub id: String,
    pub thread_id: String,
    pub connection_id: Option<String>,
    pub protocol_version: ProtocolVersion,
    pub role: CredentialRole,
    pub state: CredentialState,
    pub auto_accept: Option<AutoAcceptPolicy>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CredentialExchangeRecord {
    pub fn new(
        thread_id: String,
        connection_id: Option<String>,
        protocol_version: ProtocolVersion,
        role: CredentialRole,
        state: CredentialState,
        auto_accept: Option<AutoAcceptPolicy>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id,
            connection_id,
            protocol_version,
            role,
            state,
            auto_accept,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

impl ExchangeRecord for CredentialExchangeRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn thread_id(&self) -> &str {
        &self.thread_id
    }

    fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    fn state_tag(&self) -> &'static str {
        self.state.into()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofExchangeRecord {
    pub id: String,
    pub thread_id: String,
    pub connection_id: Option<String>,
    pub protocol_version: ProtocolVersion,
    pub role: ProofRole,
    pub state: ProofState,
    pub auto_accept: Option<AutoAcceptPolicy>,
    /// Set by the verifier once the presentation has been validated against
    /// the request. `None` until a presentation has been processed.
    pub is_verified: Option<bool>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProofExchangeRecord {
    pub fn new(
        thread_id: String,
        connection_id: Option<String>,
        protocol_version: ProtocolVersion,
        role: ProofRole,
        state: ProofState,
        auto_accept: Option<AutoAcceptPolicy>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id,
            connection_id,
            protocol_version,
            role,
            state,
            auto_accept,
            is_verified: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

impl ExchangeRecord for ProofExchangeRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn thread_id(&self) -> &str {
        &self.thread_id
    }

    fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    fn state_tag(&self) -> &'static str {
        self.state.into()
    }
}
