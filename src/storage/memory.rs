use super::{document_id, ensure_id, field_matches, DocumentStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given documents per collection
    pub fn with_documents<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let collections = collections
            .into_iter()
            .map(|(name, documents)| (name.into(), documents))
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| {
                documents
                    .iter()
                    .find(|document| document_id(document).as_deref() == Some(id))
            })
            .cloned())
    }

    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| field_matches(document, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<String> {
        let mut collections = self.collections.write().await;
        push_document(collections.entry(collection.to_string()).or_default(), collection, document)
    }

    async fn insert_unless(&self, collection: &str, field: &str, value: &str, document: Value) -> Result<Option<String>> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|existing| field_matches(existing, field, value)) {
            return Ok(None);
        }
        push_document(documents, collection, document).map(Some)
    }
}

fn push_document(documents: &mut Vec<Value>, collection: &str, mut document: Value) -> Result<String> {
    let id = ensure_id(&mut document)
        .ok_or_else(|| AppError::storage("Only JSON objects can be stored"))?;
    if documents.iter().any(|existing| document_id(existing).as_deref() == Some(id.as_str())) {
        return Err(AppError::storage(format!("Duplicate id '{}' in {}", id, collection)));
    }
    documents.push(document);
    Ok(id)
}
