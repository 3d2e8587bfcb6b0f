//! Record and message stores. The engine only ships an in-memory backend;
//! everything goes through the [`ExchangeRecordStore`] trait so a persistent
//! backend can be plugged in by the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use messages::ExchangeMessage;
use strum_macros::AsRefStr;
use tokio::sync::RwLock;
use typed_builder::TypedBuilder;

use crate::{
    errors::error::prelude::*,
    records::ExchangeRecord,
};

/// Query tags for record lookup. All set fields must match.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct RecordTags {
    #[builder(default)]
    pub thread_id: Option<String>,
    #[builder(default)]
    pub connection_id: Option<String>,
    #[builder(default)]
    pub state: Option<&'static str>,
}

impl RecordTags {
    fn matches<R: ExchangeRecord>(&self, record: &R) -> bool {
        if let Some(thread_id) = &self.thread_id {
            if record.thread_id() != thread_id {
                return false;
            }
        }
        if let Some(connection_id) = &self.connection_id {
            if record.connection_id() != Some(connection_id.as_str()) {
                return false;
            }
        }
        if let Some(state) = self.state {
            if record.state_tag() != state {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait ExchangeRecordStore<R: ExchangeRecord>: Send + Sync {
    /// Insert or overwrite the record under its id.
    async fn save(&self, record: R) -> EngineResult<()>;

    async fn get_by_id(&self, id: &str) -> EngineResult<R>;

    /// At most one record may match the tags; more than one is an error.
    async fn find_by_tags(&self, tags: &RecordTags) -> EngineResult<Option<R>>;

    async fn delete(&self, id: &str) -> EngineResult<()>;
}

pub struct InMemoryRecordStore<R> {
    records: RwLock<HashMap<String, R>>,
}

impl<R> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: ExchangeRecord> ExchangeRecordStore<R> for InMemoryRecordStore<R> {
    async fn save(&self, record: R) -> EngineResult<()> {
        self.records
            .write()
            .await
            .insert(record.id().to_owned(), record);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> EngineResult<R> {
        self.records.read().await.get(id).cloned().ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::RecordNotFound,
                format!("no record with id {id}"),
            )
        })
    }

    async fn find_by_tags(&self, tags: &RecordTags) -> EngineResult<Option<R>> {
        let records = self.records.read().await;
        let mut matches = records.values().filter(|r| tags.matches(*r));
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(EngineError::from_msg(
                EngineErrorKind::InvalidInput,
                format!("tags {tags:?} match more than one record"),
            ));
        }
        Ok(first)
    }

    async fn delete(&self, id: &str) -> EngineResult<()> {
        self.records.write().await.remove(id).ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::RecordNotFound,
                format!("no record with id {id}"),
            )
        })?;
        Ok(())
    }
}

/// Which protocol message of an exchange a stored message is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum StoredMessageKind {
    Proposal,
    Offer,
    Request,
    Credential,
    Presentation,
}

/// Protocol messages associated with an exchange record, kept so that later
/// steps (building an ack, comparing content for auto-accept) can recover
/// earlier messages without re-parsing wire payloads.
pub struct ExchangeMessageStore {
    messages: RwLock<HashMap<(String, StoredMessageKind), ExchangeMessage>>,
}

impl ExchangeMessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
        }
    }

    pub async fn put(&self, record_id: &str, kind: StoredMessageKind, message: ExchangeMessage) {
        self.messages
            .write()
            .await
            .insert((record_id.to_owned(), kind), message);
    }

    pub async fn find(&self, record_id: &str, kind: StoredMessageKind) -> Option<ExchangeMessage> {
        self.messages
            .read()
            .await
            .get(&(record_id.to_owned(), kind))
            .cloned()
    }

    pub async fn get(&self, record_id: &str, kind: StoredMessageKind) -> EngineResult<ExchangeMessage> {
        self.find(record_id, kind).await.ok_or_else(|| {
            EngineError::from_msg(
                EngineErrorKind::RecordNotFound,
                format!("no {} message stored for record {record_id}", kind.as_ref()),
            )
        })
    }
}

impl Default for ExchangeMessageStore {
    fn default() -> Self {
        Self::new()
    }
}
