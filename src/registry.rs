//! Variant registry: the closed set of protocol variants bound to storage
//!
//! The registry is built once at startup and never changes. It is the only
//! place that knows which variants exist and which storage partition backs
//! each of them.

use crate::{
    error::{AppError, Result},
    models::{RecordSchema, TestRunRecord},
    storage::DocumentStore,
    types::ProtocolVariant,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Access to one variant's storage partition
#[derive(Clone)]
pub struct PartitionHandle {
    schema: RecordSchema,
    store: Arc<dyn DocumentStore>,
}

impl PartitionHandle {
    pub fn variant(&self) -> ProtocolVariant {
        self.schema.variant()
    }

    pub fn partition(&self) -> &'static str {
        self.schema.variant().partition()
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Every record in storage order, validated against the variant's schema
    pub async fn find_all(&self) -> Result<Vec<TestRunRecord>> {
        self.store
            .find_all(self.partition())
            .await?
            .into_iter()
            .map(|document| self.schema.decode(document))
            .collect()
    }

    /// The record with the given id, if the partition holds one
    pub async fn find_by_id(&self, id: &str) -> Result<Option<TestRunRecord>> {
        match self.store.find_by_id(self.partition(), id).await? {
            Some(document) => self.schema.decode(document).map(Some),
            None => Ok(None),
        }
    }

    /// Number of stored documents, without decoding them
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.find_all(self.partition()).await?.len())
    }
}

impl std::fmt::Debug for PartitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionHandle")
            .field("variant", &self.variant())
            .field("partition", &self.partition())
            .finish()
    }
}

/// Catalogue entry describing one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantInfo {
    pub id: &'static str,
    pub partition: &'static str,
    pub title: &'static str,
}

impl From<ProtocolVariant> for VariantInfo {
    fn from(variant: ProtocolVariant) -> Self {
        Self {
            id: variant.id(),
            partition: variant.partition(),
            title: variant.title(),
        }
    }
}

/// Lookup table from variant to partition handle
pub struct VariantRegistry {
    partitions: HashMap<ProtocolVariant, PartitionHandle>,
}

impl VariantRegistry {
    /// Bind every known variant to its partition in `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let partitions = ProtocolVariant::ALL
            .iter()
            .map(|&variant| {
                let handle = PartitionHandle {
                    schema: RecordSchema::for_variant(variant),
                    store: Arc::clone(&store),
                };
                (variant, handle)
            })
            .collect();
        Self { partitions }
    }

    /// Handle for a caller-supplied variant identifier
    pub fn resolve(&self, variant_id: &str) -> Result<PartitionHandle> {
        let variant: ProtocolVariant = variant_id.parse()?;
        self.handle(variant)
    }

    /// Handle for a typed variant
    pub fn handle(&self, variant: ProtocolVariant) -> Result<PartitionHandle> {
        self.partitions
            .get(&variant)
            .cloned()
            .ok_or_else(|| AppError::unknown_variant(variant.id()))
    }

    /// Registered variants in catalogue order
    pub fn variants(&self) -> Vec<ProtocolVariant> {
        ProtocolVariant::ALL
            .iter()
            .copied()
            .filter(|variant| self.partitions.contains_key(variant))
            .collect()
    }

    pub fn catalogue(&self) -> Vec<VariantInfo> {
        self.variants().into_iter().map(VariantInfo::from).collect()
    }
}
