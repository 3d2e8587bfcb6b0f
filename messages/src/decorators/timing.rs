use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::misc::utils;

/// Struct representing the `~timing` decorator from its [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0032-message-timing/README.md>).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Timing {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "utils::serialize_opt_datetime")]
    pub out_time: Option<DateTime<Utc>>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "utils::serialize_opt_datetime")]
    pub in_time: Option<DateTime<Utc>>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "utils::serialize_opt_datetime")]
    pub expires_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::misc::test_utils;

    pub fn make_extended_timing() -> Timing {
        let dt = Utc.with_ymd_and_hms(2003, 12, 13, 18, 30, 2).unwrap();
        Timing::builder().out_time(Some(dt)).build()
    }

    #[test]
    fn test_extended_timing() {
        let timing = make_extended_timing();
        let expected = json!({ "out_time": "2003-12-13T18:30:02.000Z" });

        test_utils::test_serde(timing, expected);
    }
}
