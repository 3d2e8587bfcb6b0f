pub mod issuance;
pub mod machine;
pub mod presentation;

use messages::decorators::{attachment::Attachment, thread::Thread};

use crate::{
    errors::error::prelude::*,
    formats::FormatRegistry,
    utils::attachment::find_attachment,
};

/// The thread id a message belongs to: its `~thread.thid`, or its own `@id`
/// when it opens the thread.
pub fn thread_id_of(thread: Option<&Thread>, msg_id: &str) -> String {
    thread
        .map(|t| t.thid.clone())
        .unwrap_or_else(|| msg_id.to_owned())
}

/// Pick the first advertised format some plugin supports and return it with
/// the attachment its specifier points at.
pub(crate) fn negotiated_attachment<'a>(
    formats: &FormatRegistry,
    specifiers: impl Iterator<Item = (String, String)>,
    attachments: &'a [Attachment],
) -> EngineResult<(String, &'a Attachment)> {
    let specifiers: Vec<(String, String)> = specifiers.collect();
    let negotiated = formats.negotiate(specifiers.iter().map(|(_, f)| f.as_str()))?;
    let attach_id = specifiers
        .iter()
        .find(|(_, f)| *f == negotiated)
        .map(|(id, _)| id.clone())
        .ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::FormatNegotiation,
                format!("no attachment bound to negotiated format {negotiated}"),
            )
        })?;
    let attachment = find_attachment(attachments, &attach_id)?;
    Ok((negotiated, attachment))
}
