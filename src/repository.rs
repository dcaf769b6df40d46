//! Read-only, typed access to stored benchmark runs

use crate::{
    error::{AppError, Result},
    models::{RecordSummary, TestRunRecord},
    registry::{PartitionHandle, VariantRegistry},
    types::ProtocolVariant,
};
use std::sync::Arc;

/// Telemetry repository over the variant-partitioned store
#[derive(Clone)]
pub struct TelemetryRepository {
    registry: Arc<VariantRegistry>,
}

impl TelemetryRepository {
    pub fn new(registry: Arc<VariantRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    /// Summaries of every run stored for a variant, in storage order
    pub async fn list_summaries(&self, variant_id: &str) -> Result<Vec<RecordSummary>> {
        let partition = self.registry.resolve(variant_id)?;
        Self::summaries_of(&partition).await
    }

    /// Full record, samples included
    pub async fn get_record(&self, variant_id: &str, id: &str) -> Result<TestRunRecord> {
        let partition = self.registry.resolve(variant_id)?;
        partition
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::record_not_found(partition.variant().id(), id))
    }

    /// Number of runs stored for a typed variant
    pub async fn count(&self, variant: ProtocolVariant) -> Result<usize> {
        self.registry.handle(variant)?.count().await
    }

    async fn summaries_of(partition: &PartitionHandle) -> Result<Vec<RecordSummary>> {
        Ok(partition
            .find_all()
            .await?
            .iter()
            .map(TestRunRecord::summary)
            .collect())
    }
}
