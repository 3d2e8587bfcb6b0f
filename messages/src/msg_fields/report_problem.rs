use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::decorators::{thread::Thread, timing::Timing};

/// Common content of the `problem-report` messages carried by both protocol
/// families, as defined in the [RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0035-report-problem/README.md>).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProblemReportContent {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Description {
    pub code: String,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProblemReportDecorators {
    #[serde(rename = "~thread")]
    pub thread: Thread,
    #[builder(default)]
    #[serde(rename = "~timing")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
}
