use super::{document_id, ensure_id, field_matches, DocumentStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Directory of `<collection>.jsonl` files, one document per line
#[derive(Debug)]
pub struct JsonLinesStore {
    root: PathBuf,
    // Serializes appends within this process
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a collection
    pub fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::storage(format!("Invalid collection name: '{}'", collection)));
        }
        Ok(self.root.join(format!("{}.jsonl", collection)))
    }

    async fn load(&self, collection: &str) -> Result<Vec<Value>> {
        let path = self.collection_path(collection)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::storage(format!("Failed to read {}: {}", path.display(), e)))
            }
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    AppError::storage(format!("{}:{}: invalid JSON document: {}", path.display(), index + 1, e))
                })
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for JsonLinesStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        self.load(collection).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .find(|document| document_id(document).as_deref() == Some(id)))
    }

    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .filter(|document| field_matches(document, field, value))
            .collect())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        self.append(collection, document).await
    }

    async fn insert_unless(&self, collection: &str, field: &str, value: &str, document: Value) -> Result<Option<String>> {
        let _guard = self.write_lock.lock().await;
        if !self.find_by_field(collection, field, value).await?.is_empty() {
            return Ok(None);
        }
        self.append(collection, document).await.map(Some)
    }
}

impl JsonLinesStore {
    /// Append one document; callers hold `write_lock`
    async fn append(&self, collection: &str, mut document: Value) -> Result<String> {
        let path = self.collection_path(collection)?;
        let id = ensure_id(&mut document)
            .ok_or_else(|| AppError::storage("Only JSON objects can be stored"))?;

        if self.find_by_id(collection, &id).await?.is_some() {
            return Err(AppError::storage(format!("Duplicate id '{}' in {}", id, collection)));
        }

        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::storage(format!("Failed to create {}: {}", self.root.display(), e))
        })?;

        let mut line = serde_json::to_string(&document)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::storage(format!("Failed to open {}: {}", path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::storage(format!("Failed to write {}: {}", path.display(), e)))?;
        file.flush().await?;

        Ok(id)
    }
}
