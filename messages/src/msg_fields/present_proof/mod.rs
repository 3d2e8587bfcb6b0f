//! Messages of the `present-proof` protocol, both versions, as defined in the
//! [v1 RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0037-present-proof/README.md>)
//! and the [v2 RFC](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0454-present-proof-v2/README.md>).

pub mod v1;
pub mod v2;

use derive_more::From;

use self::{v1::PresentProofV1, v2::PresentProofV2};

#[derive(Clone, Debug, From, PartialEq)]
pub enum PresentProof {
    V1(PresentProofV1),
    V2(PresentProofV2),
}
