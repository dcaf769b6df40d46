//! Partitioned document storage backing the telemetry repository
//!
//! Each protocol variant owns one collection of raw JSON documents. The
//! repository only reads; [`DocumentStore::insert`] exists for the harness
//! result loader.

mod jsonl;
mod memory;

pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Storage collaborator interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, in insertion order
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>>;

    /// The document whose `_id` equals `id`, if any
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Documents whose top-level `field` equals the string `value`
    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>>;

    /// Append a document, assigning an `_id` when it has none; returns the id
    async fn insert(&self, collection: &str, document: Value) -> Result<String>;

    /// Append a document unless one whose `field` equals `value` is already
    /// stored. Check and append happen under one write lock.
    ///
    /// Returns the new id, or `None` when a matching document exists.
    async fn insert_unless(&self, collection: &str, field: &str, value: &str, document: Value) -> Result<Option<String>>;
}

/// Textual form of a document's `_id`
///
/// Handles plain strings, numbers and `{"$oid": ..}` wrappers.
pub(crate) fn document_id(document: &Value) -> Option<String> {
    match document.get("_id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Object(wrapper) => wrapper.get("$oid").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Whether a document's `field` holds `value`, as a string or a number
pub(crate) fn field_matches(document: &Value, field: &str, value: &str) -> bool {
    match document.get(field) {
        Some(Value::String(text)) => text == value,
        Some(Value::Number(number)) => number.to_string() == value,
        _ => false,
    }
}

/// Give the document an `_id` if it lacks one, returning the id
pub(crate) fn ensure_id(document: &mut Value) -> Option<String> {
    if let Some(id) = document_id(document) {
        return Some(id);
    }
    let object = document.as_object_mut()?;
    let id = uuid::Uuid::new_v4().simple().to_string();
    object.insert("_id".to_string(), Value::String(id.clone()));
    Some(id)
}
