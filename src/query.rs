//! Query façade consumed by presentation layers
//!
//! Combines the repository and the histogram engine into the two views the
//! dashboard pages need: a run listing and a single-run detail with its
//! latency distribution.

use crate::{
    error::{AppError, Result},
    histogram::{build_histogram, build_raw_series, Histogram, RawPoint},
    logging::QueryLogger,
    models::{RecordSummary, TestRunRecord},
    registry::VariantInfo,
    repository::TelemetryRepository,
    types::ProtocolVariant,
};
use futures::future::try_join_all;
use serde::Serialize;
use std::time::Instant;

/// Everything the chart page shows for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    pub variant: VariantInfo,
    pub record: TestRunRecord,
    pub histogram: Histogram,
    pub raw_series: Vec<RawPoint>,
}

/// Number of stored runs of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantCount {
    #[serde(flatten)]
    pub variant: VariantInfo,
    pub count: usize,
}

/// Read-only entry point for listing and detail views
#[derive(Clone)]
pub struct QueryFacade {
    repository: TelemetryRepository,
    logger: Option<QueryLogger>,
}

impl QueryFacade {
    pub fn new(repository: TelemetryRepository) -> Self {
        Self {
            repository,
            logger: None,
        }
    }

    /// Attach a logger for timings and data-consistency warnings
    pub fn with_logger(mut self, logger: QueryLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn repository(&self) -> &TelemetryRepository {
        &self.repository
    }

    /// Summaries of a variant's runs, in storage order
    pub async fn summaries(&self, variant_id: &str) -> Result<Vec<RecordSummary>> {
        let started = Instant::now();
        let summaries = self.repository.list_summaries(variant_id).await?;

        if let Some(logger) = &self.logger {
            logger.log_summaries(variant_id, summaries.len(), started.elapsed()).await;
        }
        Ok(summaries)
    }

    /// One run with its histogram and raw sample series
    ///
    /// A record whose samples cannot be charted is reported as
    /// [`AppError::CorruptRecord`] naming the record.
    pub async fn detail(&self, variant_id: &str, id: &str) -> Result<RecordDetail> {
        let started = Instant::now();
        let variant: ProtocolVariant = variant_id.parse()?;
        let record = self.repository.get_record(variant.id(), id).await?;

        let (histogram, raw_series) = match chart(&record) {
            Ok(chart) => chart,
            Err(error @ AppError::InvalidSample { .. }) => {
                return Err(AppError::corrupt_record(variant.id(), id, error));
            }
            Err(other) => return Err(other),
        };

        if let Some(logger) = &self.logger {
            if record.sample_count_consistent() == Some(false) {
                let total_receive = record.total_receive.as_ref().map(|m| m.as_str()).unwrap_or_default();
                logger.log_sample_mismatch(variant, id, record.rtt_data.len(), total_receive).await;
            }
            logger
                .log_detail(variant, id, &histogram, record.rtt_data.len(), started.elapsed())
                .await;
        }

        Ok(RecordDetail {
            variant: VariantInfo::from(variant),
            record,
            histogram,
            raw_series,
        })
    }

    /// Catalogue of registered variants
    pub fn variants(&self) -> Vec<VariantInfo> {
        self.repository.registry().catalogue()
    }

    /// Record counts of every variant, fetched concurrently
    pub async fn overview(&self) -> Result<Vec<VariantCount>> {
        let started = Instant::now();
        let variants = self.repository.registry().variants();

        let counts = try_join_all(variants.iter().map(|&variant| self.repository.count(variant))).await?;

        let overview: Vec<VariantCount> = variants
            .into_iter()
            .zip(counts)
            .map(|(variant, count)| VariantCount {
                variant: VariantInfo::from(variant),
                count,
            })
            .collect();

        if let Some(logger) = &self.logger {
            let records = overview.iter().map(|entry| entry.count).sum();
            logger.log_overview(overview.len(), records, started.elapsed()).await;
        }
        Ok(overview)
    }
}

fn chart(record: &TestRunRecord) -> Result<(Histogram, Vec<RawPoint>)> {
    let histogram = build_histogram(&record.rtt_data, record.max_rtt.as_ref())?;
    let raw_series = build_raw_series(&record.rtt_data)?;
    Ok((histogram, raw_series))
}
