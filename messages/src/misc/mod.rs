mod maybe_known;
mod mime_type;
pub(crate) mod utils;

pub use maybe_known::MaybeKnown;
pub use mime_type::MimeType;

#[cfg(test)]
pub mod test_utils {
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    use crate::ExchangeMessage;

    /// Wraps `content` and `decorators` into a full message with a fixed id,
    /// checks that it serializes to `expected` (plus the envelope fields) and
    /// that the serialized form deserializes back to the same message.
    pub fn test_msg<T>(msg: T, msg_type: &str, mut expected: Value)
    where
        T: Into<ExchangeMessage>,
    {
        let msg = msg.into();

        let obj = expected.as_object_mut().expect("JSON object");
        obj.insert("@id".to_owned(), json!("test"));
        obj.insert("@type".to_owned(), json!(msg_type));

        test_serde(msg, expected);
    }

    pub fn test_serde<T>(value: T, expected: Value)
    where
        T: for<'de> Deserialize<'de> + Serialize + std::fmt::Debug + PartialEq,
    {
        assert_eq!(serde_json::to_value(&value).unwrap(), expected);

        let deserialized = T::deserialize(expected.clone()).unwrap();
        assert_eq!(deserialized, value);
    }
}
