//! Change events from the watched collections.
//!
//! A [`RawChange`] is what the change feed hands us: an operation, the id of
//! the touched document and, when it still exists, the full document after
//! the change. [`ChangeEvent::normalize`] turns that into the shape we emit:
//!
//! 1. internal-only fields are stripped,
//! 2. a soft-deleted document is reported as `delete` whatever the raw
//!    operation was, and the `deleted` flag is removed,
//! 3. the event name becomes `<operation>:<collection>`.
//!
//! Collection-specific enrichment (`prepare_*`) runs after normalization.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::policy::{policies_from, Policy, READ_COMMENTS, READ_COMMENT_THREADS};

/// A JSON document as stored in a collection.
pub type Document = Map<String, Value>;

/// Soft-delete marker on comments and threads.
pub const SOFT_DELETE_FIELD: &str = "deleted";

/// A watched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Comment,
    CommentThread,
    Notification,
}

impl Collection {
    /// Every collection the fan-out engine watches.
    pub const ALL: [Collection; 3] = [
        Collection::Comment,
        Collection::CommentThread,
        Collection::Notification,
    ];

    /// Collection name as used in event names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Comment => "comment",
            Collection::CommentThread => "commentThread",
            Collection::Notification => "notification",
        }
    }

    /// Key wrapping the document in the outgoing payload.
    pub fn payload_key(&self) -> &'static str {
        match self {
            Collection::Comment => "comment",
            Collection::CommentThread => "thread",
            Collection::Notification => "notification",
        }
    }

    /// Fields that never leave the server.
    pub fn internal_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Comment | Collection::CommentThread => &["deletedAt", "_class"],
            Collection::Notification => &["deletedAt", "deleted"],
        }
    }

    /// Permission a recipient needs, or `None` for owner-addressed collections.
    pub fn read_permission(&self) -> Option<&'static str> {
        match self {
            Collection::Comment => Some(READ_COMMENTS),
            Collection::CommentThread => Some(READ_COMMENT_THREADS),
            Collection::Notification => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw change-feed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
    Update,
    Replace,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Update => "update",
            OperationType::Replace => "replace",
            OperationType::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change as delivered by the change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub collection: Collection,
    pub operation: OperationType,
    pub document_id: String,
    /// The document after the change; absent once the document is gone.
    pub full_document: Option<Document>,
}

impl RawChange {
    pub fn new(
        collection: Collection,
        operation: OperationType,
        document_id: impl Into<String>,
        full_document: Option<Document>,
    ) -> Self {
        Self {
            collection,
            operation,
            document_id: document_id.into(),
            full_document,
        }
    }
}

/// Why a change could not be turned into an outgoing event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("No full document for {collection} change on {document_id}")]
    MissingDocument {
        collection: Collection,
        document_id: String,
    },

    #[error("{collection} document {document_id} has no usable '{field}'")]
    MissingField {
        collection: Collection,
        document_id: String,
        field: &'static str,
    },
}

/// A normalized change, ready for enrichment and delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub collection: Collection,
    /// Effective operation, after the soft-delete override.
    pub operation: OperationType,
    pub document_id: String,
    pub document: Document,
    pub event_name: String,
}

/// A finished event addressed to identity channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotice {
    pub event: String,
    pub payload: Value,
}

impl ChangeEvent {
    /// Strips internal fields and applies the soft-delete override.
    pub fn normalize(raw: RawChange) -> Result<Self, NormalizeError> {
        let RawChange {
            collection,
            operation,
            document_id,
            full_document,
        } = raw;

        let mut document = full_document.ok_or_else(|| NormalizeError::MissingDocument {
            collection,
            document_id: document_id.clone(),
        })?;

        for field in collection.internal_fields() {
            document.remove(*field);
        }

        let soft_deleted = matches!(document.remove(SOFT_DELETE_FIELD), Some(Value::Bool(true)));
        let operation = if soft_deleted {
            OperationType::Delete
        } else {
            operation
        };

        Ok(Self {
            collection,
            operation,
            event_name: format!("{}:{}", operation, collection),
            document_id,
            document,
        })
    }

    /// The document's embedded access-control list.
    pub fn policies(&self) -> Vec<Policy> {
        policies_from(self.document.get("policies"))
    }

    /// Id of the comment's parent thread.
    pub fn thread_id(&self) -> Result<&str, NormalizeError> {
        self.string_field("threadId")
    }

    /// Comment enrichment: client-facing timestamps plus the parent
    /// thread's application id.
    pub fn prepare_comment(mut self, application_id: impl Into<String>) -> Self {
        rename_timestamps(&mut self.document);
        self.document
            .insert("applicationId".to_string(), Value::String(application_id.into()));
        self
    }

    /// Thread enrichment: client-facing timestamps, always reported unread.
    pub fn prepare_thread(mut self) -> Self {
        rename_timestamps(&mut self.document);
        self.document.insert("isViewed".to_string(), Value::Bool(false));
        self
    }

    /// Notification enrichment: derives `type` from the class discriminator
    /// and returns the owning user's email alongside the event.
    pub fn prepare_notification(mut self) -> Result<(String, Self), NormalizeError> {
        let owner = self.string_field("forUsername")?.to_string();
        let class = self.string_field("_class")?;
        let kind = class.rsplit('.').next().unwrap_or(class).to_string();

        self.document.remove("_class");
        self.document.insert("type".to_string(), Value::String(kind));
        Ok((owner, self))
    }

    /// Wraps the document under its collection's payload key.
    pub fn into_notice(self) -> ChangeNotice {
        let mut payload = Map::new();
        payload.insert(
            self.collection.payload_key().to_string(),
            Value::Object(self.document),
        );
        ChangeNotice {
            event: self.event_name,
            payload: Value::Object(payload),
        }
    }

    fn string_field(&self, field: &'static str) -> Result<&str, NormalizeError> {
        self.document
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| NormalizeError::MissingField {
                collection: self.collection,
                document_id: self.document_id.clone(),
                field,
            })
    }
}

/// `createdAt`/`updatedAt` become `creationTime`/`updationTime`.
fn rename_timestamps(document: &mut Document) {
    for (from, to) in [("createdAt", "creationTime"), ("updatedAt", "updationTime")] {
        if let Some(value) = document.remove(from) {
            document.insert(to.to_string(), value);
        }
    }
}

impl ChangeNotice {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}
