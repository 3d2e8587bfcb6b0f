use std::{error::Error, fmt};

pub mod prelude {
    pub use super::{err_msg, EngineError, EngineErrorKind, EngineResult};
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum EngineErrorKind {
    // Protocol state
    #[error("Illegal state transition attempted for the current record state")]
    StateTransition,
    #[error("No mutually supported attachment format")]
    FormatNegotiation,
    #[error("Message references a thread id that does not resolve to a record")]
    UnresolvedThread,
    #[error("No record found for the given id")]
    RecordNotFound,

    // Common
    #[error("Object is in invalid state for requested operation")]
    InvalidState,
    #[error("Invalid JSON string")]
    InvalidJson,
    #[error("Invalid input parameter")]
    InvalidInput,
    #[error("Action is not supported")]
    ActionNotSupported,
    #[error("Unable to serialize")]
    SerializationError,
    #[error("Attachment is malformed or not decodable")]
    InvalidAttachment,
    #[error("Message failed in post")]
    PostMessageFailed,
}

#[derive(thiserror::Error)]
pub struct EngineError {
    msg: String,
    kind: EngineErrorKind,
}

fn format_error(err: &EngineError, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Error: {}", err.msg())?;
    let mut current = err.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n{cause}")?;
        current = cause.source();
    }
    Ok(())
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_error(self, f)
    }
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_error(self, f)
    }
}

impl EngineError {
    pub fn from_msg<D>(kind: EngineErrorKind, msg: D) -> EngineError
    where
        D: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        EngineError {
            msg: msg.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> EngineErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

pub fn err_msg<D>(kind: EngineErrorKind, msg: D) -> EngineError
where
    D: fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    EngineError::from_msg(kind, msg)
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::from_msg(EngineErrorKind::InvalidJson, err.to_string())
    }
}
