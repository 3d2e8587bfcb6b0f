use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum MimeType {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/plain")]
    Plain,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "application/octet-stream")]
    OctetStream,
}
