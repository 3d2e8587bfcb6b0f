//! Auto-accept policies and the coordinators deciding whether the engine
//! replies to a received message without caller involvement.
//!
//! Coordinators are pure: they read records and payloads and return a
//! decision, never mutating state. They are consulted only after a
//! `*Received` transition has been persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::{CredentialExchangeRecord, ProofExchangeRecord};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoAcceptPolicy {
    /// Respond to every legal step on this exchange.
    Always,
    /// Respond when the received content structurally matches what this side
    /// already proposed or offered on the thread.
    ContentApproved,
    #[default]
    Never,
}

/// The record-level override wins over the agent default.
pub fn compose_auto_accept(
    record_policy: Option<AutoAcceptPolicy>,
    agent_default: AutoAcceptPolicy,
) -> AutoAcceptPolicy {
    record_policy.unwrap_or(agent_default)
}

/// Structural JSON equality: equal iff the key sets match at every level and
/// the leaves are equal. Object key order is irrelevant, array order is
/// significant.
pub fn value_equality(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, va)| b.get(key).is_some_and(|vb| value_equality(va, vb)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(va, vb)| value_equality(va, vb))
        }
        _ => a == b,
    }
}

fn decide(
    policy: AutoAcceptPolicy,
    received: &Value,
    counterpart: Option<&Value>,
) -> bool {
    match policy {
        AutoAcceptPolicy::Always => true,
        AutoAcceptPolicy::Never => false,
        AutoAcceptPolicy::ContentApproved => {
            counterpart.is_some_and(|ours| value_equality(received, ours))
        }
    }
}

pub struct CredentialResponseCoordinator {
    agent_default: AutoAcceptPolicy,
}

impl CredentialResponseCoordinator {
    pub fn new(agent_default: AutoAcceptPolicy) -> Self {
        Self { agent_default }
    }

    fn policy(&self, record: &CredentialExchangeRecord) -> AutoAcceptPolicy {
        compose_auto_accept(record.auto_accept, self.agent_default)
    }

    /// `proposal_attrs` are the received preview attributes, `offered_attrs`
    /// those of the offer this side previously sent on the thread, if any.
    pub fn should_auto_respond_to_proposal(
        &self,
        record: &CredentialExchangeRecord,
        proposal_attrs: &Value,
        offered_attrs: Option<&Value>,
    ) -> bool {
        decide(self.policy(record), proposal_attrs, offered_attrs)
    }

    pub fn should_auto_respond_to_offer(
        &self,
        record: &CredentialExchangeRecord,
        offer_attrs: &Value,
        proposed_attrs: Option<&Value>,
    ) -> bool {
        decide(self.policy(record), offer_attrs, proposed_attrs)
    }

    /// Requests echo the offer payload they answer, so content approval is a
    /// payload comparison against our stored offer.
    pub fn should_auto_respond_to_request(
        &self,
        record: &CredentialExchangeRecord,
        request_payload: &Value,
        offer_payload: Option<&Value>,
    ) -> bool {
        decide(self.policy(record), request_payload, offer_payload)
    }

    pub fn should_auto_respond_to_credential(
        &self,
        record: &CredentialExchangeRecord,
        credential_payload: &Value,
        offer_payload: Option<&Value>,
    ) -> bool {
        decide(self.policy(record), credential_payload, offer_payload)
    }
}

pub struct ProofResponseCoordinator {
    agent_default: AutoAcceptPolicy,
}

impl ProofResponseCoordinator {
    pub fn new(agent_default: AutoAcceptPolicy) -> Self {
        Self { agent_default }
    }

    fn policy(&self, record: &ProofExchangeRecord) -> AutoAcceptPolicy {
        compose_auto_accept(record.auto_accept, self.agent_default)
    }

    /// There is no proof proposal to compare a request against, so content
    /// approval cannot apply and only `Always` answers a request unprompted.
    pub fn should_auto_respond_to_request(&self, record: &ProofExchangeRecord) -> bool {
        matches!(self.policy(record), AutoAcceptPolicy::Always)
    }

    pub fn should_auto_respond_to_presentation(&self, record: &ProofExchangeRecord) -> bool {
        match self.policy(record) {
            AutoAcceptPolicy::Always => true,
            AutoAcceptPolicy::ContentApproved => record.is_verified == Some(true),
            AutoAcceptPolicy::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::records::{
        CredentialRole, CredentialState, ProofRole, ProofState, ProtocolVersion,
    };

    #[test]
    fn test_compose_override_wins() {
        assert_eq!(
            compose_auto_accept(Some(AutoAcceptPolicy::Always), AutoAcceptPolicy::Never),
            AutoAcceptPolicy::Always
        );
        assert_eq!(
            compose_auto_accept(None, AutoAcceptPolicy::ContentApproved),
            AutoAcceptPolicy::ContentApproved
        );
        assert_eq!(compose_auto_accept(None, AutoAcceptPolicy::default()), AutoAcceptPolicy::Never);
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let a = json!({ "name": "John", "age": "99", "nested": { "x": 1, "y": [1, 2] } });
        let b = json!({ "age": "99", "nested": { "y": [1, 2], "x": 1 }, "name": "John" });
        assert!(value_equality(&a, &b));
    }

    #[test]
    fn test_equality_is_sensitive_to_values_and_keys() {
        let a = json!({ "name": "John", "age": "99" });
        assert!(!value_equality(&a, &json!({ "name": "John", "age": "98" })));
        assert!(!value_equality(&a, &json!({ "name": "John" })));
        assert!(!value_equality(&a, &json!({ "name": "John", "age": "99", "extra": 1 })));
    }

    #[test]
    fn test_equality_array_order_is_significant() {
        assert!(!value_equality(&json!([1, 2]), &json!([2, 1])));
        assert!(value_equality(&json!([1, 2]), &json!([1, 2])));
    }

    fn cred_record(policy: Option<AutoAcceptPolicy>) -> CredentialExchangeRecord {
        CredentialExchangeRecord::new(
            "thid".to_owned(),
            None,
            ProtocolVersion::V1,
            CredentialRole::Holder,
            CredentialState::OfferReceived,
            policy,
        )
    }

    #[test]
    fn test_content_approved_offer() {
        let coordinator = CredentialResponseCoordinator::new(AutoAcceptPolicy::ContentApproved);
        let record = cred_record(None);
        let proposed = json!([{ "name": "name", "value": "John" }]);
        let offered = json!([{ "name": "name", "value": "John" }]);
        let changed = json!([{ "name": "name", "value": "Jane" }]);

        assert!(coordinator.should_auto_respond_to_offer(&record, &offered, Some(&proposed)));
        assert!(!coordinator.should_auto_respond_to_offer(&record, &changed, Some(&proposed)));
        assert!(!coordinator.should_auto_respond_to_offer(&record, &offered, None));
    }

    #[test]
    fn test_never_policy_blocks_everything() {
        let coordinator = CredentialResponseCoordinator::new(AutoAcceptPolicy::Never);
        let record = cred_record(None);
        let attrs = json!([{ "name": "name", "value": "John" }]);
        assert!(!coordinator.should_auto_respond_to_offer(&record, &attrs, Some(&attrs)));
    }

    #[test]
    fn test_proof_presentation_auto_respond() {
        let coordinator = ProofResponseCoordinator::new(AutoAcceptPolicy::ContentApproved);
        let mut record = ProofExchangeRecord::new(
            "thid".to_owned(),
            None,
            ProtocolVersion::V1,
            ProofRole::Verifier,
            ProofState::PresentationReceived,
            None,
        );
        assert!(!coordinator.should_auto_respond_to_presentation(&record));

        record.is_verified = Some(true);
        assert!(coordinator.should_auto_respond_to_presentation(&record));

        record.is_verified = Some(false);
        assert!(!coordinator.should_auto_respond_to_presentation(&record));
    }
}
