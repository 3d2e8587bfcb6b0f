use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    msg_fields::report_problem::{ProblemReportContent, ProblemReportDecorators},
    msg_parts::MsgParts,
};

pub type CredIssuanceV1ProblemReport =
    MsgParts<CredIssuanceV1ProblemReportContent, ProblemReportDecorators>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
#[serde(transparent)]
pub struct CredIssuanceV1ProblemReportContent {
    pub inner: ProblemReportContent,
}

impl From<ProblemReportContent> for CredIssuanceV1ProblemReportContent {
    fn from(value: ProblemReportContent) -> Self {
        Self { inner: value }
    }
}
