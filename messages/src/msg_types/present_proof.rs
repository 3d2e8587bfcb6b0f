use strum_macros::{AsRefStr, EnumString, IntoStaticStr};

/// Message kinds of the `present-proof` protocol, version 1.0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum PresentProofTypeV1_0 {
    RequestPresentation,
    Presentation,
    Ack,
    ProblemReport,
}

/// Message kinds of the `present-proof` protocol, version 2.0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum PresentProofTypeV2_0 {
    RequestPresentation,
    Presentation,
    Ack,
    ProblemReport,
}
