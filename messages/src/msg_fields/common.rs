use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::misc::MaybeKnown;

/// Binds an attachment (by its `@id`) to the format its content is encoded in,
/// as used by the V2 protocol messages.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct AttachmentFormatSpecifier<F> {
    pub attach_id: String,
    pub format: MaybeKnown<F>,
}

impl<F> AttachmentFormatSpecifier<F> {
    /// The raw format string, known or not.
    pub fn raw_format(&self) -> String
    where
        F: Serialize,
    {
        match &self.format {
            MaybeKnown::Known(f) => serde_json::to_value(f)
                .ok()
                .and_then(|v| v.as_str().map(ToOwned::to_owned))
                .unwrap_or_default(),
            MaybeKnown::Unknown(s) => s.clone(),
        }
    }
}
