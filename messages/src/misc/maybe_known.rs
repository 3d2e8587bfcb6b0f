use serde::{Deserialize, Serialize};

/// Deserialization-tolerant wrapper for values which are typically represented
/// by an enum, but where unknown values may legitimately appear on the wire
/// (e.g. attachment format identifiers registered by other agents).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MaybeKnown<T> {
    Known(T),
    Unknown(String),
}

impl<T> MaybeKnown<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown(_) => None,
        }
    }
}
