//! Attachment format plugins. A plugin owns the encoding of protocol
//! payloads into attachments for the format identifiers it supports; the
//! registry picks the plugin during format negotiation.

pub mod hlindy;
pub mod ld_proof;

use std::sync::Arc;

use async_trait::async_trait;
use messages::decorators::attachment::Attachment;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumString};

use crate::errors::error::prelude::*;

/// Well-known `@id` values for the protocol attachments built by the
/// shipped plugins.
#[derive(Debug, Clone, AsRefStr, EnumString, PartialEq)]
pub enum AttachmentId {
    #[strum(serialize = "libindy-cred-offer-0")]
    CredentialOffer,
    #[strum(serialize = "libindy-cred-request-0")]
    CredentialRequest,
    #[strum(serialize = "libindy-cred-0")]
    Credential,
    #[strum(serialize = "libindy-request-presentation-0")]
    PresentationRequest,
    #[strum(serialize = "libindy-presentation-0")]
    Presentation,
}

#[async_trait]
pub trait AttachmentFormat: Send + Sync {
    /// Whether this plugin can encode and decode the given format identifier.
    fn supports_format(&self, format: &str) -> bool;

    async fn create_attachment(&self, payload: &Value, attach_id: String)
        -> EngineResult<Attachment>;

    async fn process_attachment(&self, attachment: &Attachment) -> EngineResult<Value>;

    /// Build a presentation payload satisfying the given proof request.
    async fn create_presentation_payload(&self, request: &Value) -> EngineResult<Value>;

    /// Validate a presentation against the request it answers. A presentation
    /// that is well-formed but does not satisfy the request yields
    /// `Ok(false)`, not an error.
    async fn verify_presentation(&self, request: &Value, presentation: &Value)
        -> EngineResult<bool>;
}

#[derive(Clone, Default)]
pub struct FormatRegistry {
    plugins: Vec<Arc<dyn AttachmentFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn register(mut self, plugin: Arc<dyn AttachmentFormat>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn resolve(&self, format: &str) -> EngineResult<Arc<dyn AttachmentFormat>> {
        self.plugins
            .iter()
            .find(|p| p.supports_format(format))
            .cloned()
            .ok_or_else(|| {
                EngineError::from_msg(
                    EngineErrorKind::FormatNegotiation,
                    format!("no plugin registered for format {format}"),
                )
            })
    }

    /// The first offered format identifier some plugin supports.
    pub fn negotiate<'a>(
        &self,
        offered: impl IntoIterator<Item = &'a str>,
    ) -> EngineResult<String> {
        let mut seen = Vec::new();
        for format in offered {
            if self.plugins.iter().any(|p| p.supports_format(format)) {
                return Ok(format.to_owned());
            }
            seen.push(format.to_owned());
        }
        Err(EngineError::from_msg(
            EngineErrorKind::FormatNegotiation,
            format!("no mutually supported format among {seen:?}"),
        ))
    }
}
