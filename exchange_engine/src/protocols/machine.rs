//! Pure transition tables for both protocol families. Both versions of a
//! family share one table; they differ only in message encoding.
//!
//! `None` as the current state means no record exists yet, which is only
//! legal for protocol-initiating steps. An illegal `(state, role, step)`
//! combination returns `None` and the caller raises
//! [`EngineErrorKind::StateTransition`] without touching the record.

use crate::{
    errors::error::prelude::*,
    records::{CredentialRole, CredentialState, ProofRole, ProofState},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CredentialStep {
    SendProposal,
    ReceiveProposal,
    SendOffer,
    ReceiveOffer,
    SendRequest,
    ReceiveRequest,
    SendCredential,
    ReceiveCredential,
    SendAck,
    ReceiveAck,
    Decline,
    Abandon,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProofStep {
    SendRequest,
    ReceiveRequest,
    SendPresentation,
    ReceivePresentation,
    SendAck,
    ReceiveAck,
    Decline,
    Abandon,
}

pub fn credential_next_state(
    current: Option<CredentialState>,
    role: CredentialRole,
    step: CredentialStep,
) -> Option<CredentialState> {
    use CredentialRole::*;
    use CredentialState::*;
    use CredentialStep::*;

    match (role, step, current) {
        // A proposal either opens the exchange or counters an offer.
        (Holder, SendProposal, None | Some(OfferReceived)) => Some(ProposalSent),
        (Holder, ReceiveOffer, None | Some(ProposalSent)) => Some(OfferReceived),
        (Holder, SendRequest, Some(OfferReceived)) => Some(RequestSent),
        (Holder, ReceiveCredential, Some(RequestSent)) => Some(CredentialReceived),
        (Holder, SendAck, Some(CredentialReceived)) => Some(Done),

        (Issuer, ReceiveProposal, None | Some(OfferSent)) => Some(ProposalReceived),
        (Issuer, SendOffer, None | Some(ProposalReceived)) => Some(OfferSent),
        (Issuer, ReceiveRequest, Some(OfferSent)) => Some(RequestReceived),
        (Issuer, SendCredential, Some(RequestReceived)) => Some(CredentialIssued),
        (Issuer, ReceiveAck, Some(CredentialIssued)) => Some(Done),

        (_, Decline, Some(state)) if !state.is_terminal() => Some(Declined),
        (_, Abandon, Some(state)) if !state.is_terminal() => Some(Abandoned),

        _ => None,
    }
}

pub fn proof_next_state(
    current: Option<ProofState>,
    role: ProofRole,
    step: ProofStep,
) -> Option<ProofState> {
    use ProofRole::*;
    use ProofState::*;
    use ProofStep::*;

    match (role, step, current) {
        (Verifier, SendRequest, None) => Some(RequestSent),
        (Verifier, ReceivePresentation, Some(RequestSent)) => Some(PresentationReceived),
        (Verifier, SendAck, Some(PresentationReceived)) => Some(Done),

        (Prover, ReceiveRequest, None) => Some(RequestReceived),
        (Prover, SendPresentation, Some(RequestReceived)) => Some(PresentationSent),
        (Prover, ReceiveAck, Some(PresentationSent)) => Some(Done),

        (_, Decline, Some(state)) if !state.is_terminal() => Some(Declined),
        (_, Abandon, Some(state)) if !state.is_terminal() => Some(Abandoned),

        _ => None,
    }
}

pub fn credential_transition(
    current: Option<CredentialState>,
    role: CredentialRole,
    step: CredentialStep,
) -> EngineResult<CredentialState> {
    credential_next_state(current, role, step).ok_or_else(|| {
        EngineError::from_msg(
            EngineErrorKind::StateTransition,
            format!("step {step:?} is illegal for {role:?} in state {current:?}"),
        )
    })
}

pub fn proof_transition(
    current: Option<ProofState>,
    role: ProofRole,
    step: ProofStep,
) -> EngineResult<ProofState> {
    proof_next_state(current, role, step).ok_or_else(|| {
        EngineError::from_msg(
            EngineErrorKind::StateTransition,
            format!("step {step:?} is illegal for {role:?} in state {current:?}"),
        )
    })
}
