use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Struct representing the `~please_ack` decorator from its [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0317-please-ack/README.md>).
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, TypedBuilder)]
pub struct PleaseAck {
    #[serde(default)]
    pub on: Vec<AckOn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckOn {
    Receipt,
    Outcome,
}

#[cfg(test)]
pub mod tests {
    use serde_json::json;

    use super::*;
    use crate::misc::test_utils;

    pub fn make_minimal_please_ack() -> PleaseAck {
        let on = vec![AckOn::Receipt, AckOn::Outcome];
        PleaseAck::builder().on(on).build()
    }

    #[test]
    fn test_minimal_please_ack() {
        let please_ack = make_minimal_please_ack();
        let expected = json!({ "on": please_ack.on });

        test_utils::test_serde(please_ack, expected);
    }
}
