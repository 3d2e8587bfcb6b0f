pub mod ack;
pub mod present;
pub mod problem_report;
pub mod request;

use derive_more::From;

use self::{
    ack::AckPresentationV1, present::PresentationV1, problem_report::PresentProofV1ProblemReport,
    request::RequestPresentationV1,
};

#[derive(Clone, Debug, From, PartialEq)]
pub enum PresentProofV1 {
    RequestPresentation(RequestPresentationV1),
    Presentation(PresentationV1),
    Ack(AckPresentationV1),
    ProblemReport(PresentProofV1ProblemReport),
}
