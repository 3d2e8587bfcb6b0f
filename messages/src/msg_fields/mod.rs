pub mod common;
pub mod cred_issuance;
pub mod notification;
pub mod present_proof;
pub mod report_problem;
