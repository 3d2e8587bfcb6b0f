pub mod ack;
pub mod present;
pub mod problem_report;
pub mod request;

use derive_more::From;

use self::{
    ack::AckPresentationV2, present::PresentationV2, problem_report::PresentProofV2ProblemReport,
    request::RequestPresentationV2,
};

#[derive(Clone, Debug, From, PartialEq)]
pub enum PresentProofV2 {
    RequestPresentation(RequestPresentationV2),
    Presentation(PresentationV2),
    Ack(AckPresentationV2),
    ProblemReport(PresentProofV2ProblemReport),
}
