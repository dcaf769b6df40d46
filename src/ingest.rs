//! Harness result import
//!
//! The benchmark harness writes one CSV file per run: `key,value` rows for
//! the run statistics, followed by one `index,rtt` row per received packet.
//! Importing such a file routes it to its variant's partition, skipping runs
//! whose `timeStamp` is already stored.

use crate::{
    error::{AppError, Result},
    logging::QueryLogger,
    models::RecordSchema,
    storage::DocumentStore,
    types::ProtocolVariant,
};
use chrono::{Local, NaiveDate};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Result of importing one harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ImportOutcome {
    /// The run was stored under `id`
    Inserted { variant: ProtocolVariant, id: String },
    /// A run with the same `timeStamp` was already stored
    Duplicate {
        variant: ProtocolVariant,
        #[serde(rename = "timeStamp")]
        time_stamp: String,
    },
}

impl ImportOutcome {
    pub fn variant(&self) -> ProtocolVariant {
        match self {
            Self::Inserted { variant, .. } | Self::Duplicate { variant, .. } => *variant,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

/// Parse a harness CSV into a record document
///
/// Rows keyed by a number are RTT samples and are appended to `rttData` in
/// file order; every other row sets the named field. The import date is not
/// added here.
pub fn parse_harness_csv<R: Read>(reader: R) -> Result<Map<String, Value>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut document = Map::new();
    let mut rtt_data = Vec::new();

    for (line, row) in csv.records().enumerate() {
        let row = row?;
        let key = row.get(0).unwrap_or_default();
        if key.is_empty() && row.len() <= 1 {
            continue;
        }
        let value = row
            .get(1)
            .ok_or_else(|| AppError::import(format!("Row {} ('{}') has no value", line + 1, key)))?;

        if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
            rtt_data.push(Value::String(value.to_string()));
        } else {
            document.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    document.insert("rttData".to_string(), Value::Array(rtt_data));
    Ok(document)
}

/// Variant a parsed harness document belongs to
pub fn route(document: &Map<String, Value>) -> Result<ProtocolVariant> {
    let library = document
        .get("library")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::import("Harness result has no 'library' field"))?;
    let packet_style = document.get("packetStyle").and_then(Value::as_str);

    ProtocolVariant::from_harness(library, packet_style).ok_or_else(|| match packet_style {
        Some(style) if library == "mrtp" => AppError::unknown_variant(format!("{}/{}", library, style)),
        _ => AppError::unknown_variant(library),
    })
}

/// Loads harness CSV files into a document store
pub struct HarnessImporter {
    store: Arc<dyn DocumentStore>,
    logger: Option<QueryLogger>,
}

impl HarnessImporter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, logger: None }
    }

    pub fn with_logger(mut self, logger: QueryLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Import a harness CSV file, dated today
    pub async fn import_path(&self, path: &Path) -> Result<ImportOutcome> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.import_reader(bytes.as_slice()).await
    }

    /// Import a harness CSV from any reader, dated today
    pub async fn import_reader<R: Read>(&self, reader: R) -> Result<ImportOutcome> {
        self.import_dated(reader, Local::now().date_naive()).await
    }

    /// Import a harness CSV with an explicit import date
    pub async fn import_dated<R: Read>(&self, reader: R, date: NaiveDate) -> Result<ImportOutcome> {
        let mut document = parse_harness_csv(reader)?;
        document.insert("time".to_string(), Value::String(date.format("%Y-%m-%d").to_string()));
        self.import_document(document).await
    }

    /// Store a parsed harness document unless its `timeStamp` is already present
    pub async fn import_document(&self, document: Map<String, Value>) -> Result<ImportOutcome> {
        let variant = route(&document)?;
        let time_stamp = document
            .get("timeStamp")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AppError::import("Harness result has no 'timeStamp' field"))?;

        // Reject documents the read side could not decode
        let mut candidate = document.clone();
        candidate.insert("_id".to_string(), Value::String(String::new()));
        RecordSchema::for_variant(variant).decode(Value::Object(candidate))?;

        let inserted = self
            .store
            .insert_unless(variant.partition(), "timeStamp", &time_stamp, Value::Object(document))
            .await?;

        let outcome = match inserted {
            Some(id) => ImportOutcome::Inserted { variant, id },
            None => ImportOutcome::Duplicate { variant, time_stamp: time_stamp.clone() },
        };

        if let Some(logger) = &self.logger {
            let id = match &outcome {
                ImportOutcome::Inserted { id, .. } => Some(id.as_str()),
                ImportOutcome::Duplicate { .. } => None,
            };
            logger.log_import(variant, id, Some(&time_stamp)).await;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonLinesStore, MemoryStore};
    use serde_json::json;

    const KCP_RUN: &str = "library,kcp\n\
        timeStamp,1554076800\n\
        maxRtt,45\n\
        totalReceive,4\n\
        0,5\n\
        1,25\n\
        2,44\n\
        3,10\n";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 4, 1).unwrap()
    }

    #[test]
    fn test_parse_splits_samples_from_fields() {
        let document = parse_harness_csv(KCP_RUN.as_bytes()).unwrap();
        assert_eq!(document["library"], json!("kcp"));
        assert_eq!(document["maxRtt"], json!("45"));
        assert_eq!(document["rttData"], json!(["5", "25", "44", "10"]));
    }

    #[test]
    fn test_parse_trims_and_skips_blank_lines() {
        let document = parse_harness_csv(" library , tcp \n\n 0 , 7 \n".as_bytes()).unwrap();
        assert_eq!(document["library"], json!("tcp"));
        assert_eq!(document["rttData"], json!(["7"]));
    }

    #[test]
    fn test_parse_rejects_rows_without_value() {
        let err = parse_harness_csv("library,tcp\nmaxRtt\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Import(_)));
    }

    #[test]
    fn test_route() {
        let mut document = Map::new();
        document.insert("library".into(), json!("mrtp"));
        document.insert("packetStyle".into(), json!("redundancynoack"));
        assert_eq!(route(&document).unwrap(), ProtocolVariant::MrtpRedundancyNoack);

        document.insert("packetStyle".into(), json!("bogus"));
        assert!(matches!(route(&document).unwrap_err(), AppError::UnknownVariant { ref variant } if variant == "mrtp/bogus"));

        document.insert("library".into(), json!("quic"));
        assert!(matches!(route(&document).unwrap_err(), AppError::UnknownVariant { .. }));

        assert!(matches!(route(&Map::new()).unwrap_err(), AppError::Import(_)));
    }

    #[tokio::test]
    async fn test_import_inserts_then_detects_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let importer = HarnessImporter::new(store.clone());

        let first = importer.import_dated(KCP_RUN.as_bytes(), date()).await.unwrap();
        assert!(first.is_inserted());
        assert_eq!(first.variant(), ProtocolVariant::Kcp);

        let stored = store.find_all("kcp_test").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["time"], json!("2019-04-01"));

        let second = importer.import_dated(KCP_RUN.as_bytes(), date()).await.unwrap();
        assert_eq!(
            second,
            ImportOutcome::Duplicate { variant: ProtocolVariant::Kcp, time_stamp: "1554076800".to_string() }
        );
        assert_eq!(store.find_all("kcp_test").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_library_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let importer = HarnessImporter::new(store.clone());

        let err = importer
            .import_dated("library,quic\ntimeStamp,1\n0,5\n".as_bytes(), date())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownVariant { .. }));
        for variant in ProtocolVariant::ALL {
            assert!(store.find_all(variant.partition()).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_time_stamp_fails() {
        let importer = HarnessImporter::new(Arc::new(MemoryStore::new()));
        let err = importer.import_dated("library,tcp\n0,5\n".as_bytes(), date()).await.unwrap_err();
        assert!(matches!(err, AppError::Import(_)));
    }

    #[tokio::test]
    async fn test_import_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        std::fs::write(&path, KCP_RUN).unwrap();

        let importer = HarnessImporter::new(Arc::new(MemoryStore::new()));
        assert!(importer.import_path(&path).await.unwrap().is_inserted());
        assert!(matches!(
            importer.import_path(&dir.path().join("missing.csv")).await.unwrap_err(),
            AppError::Io(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_imports_store_one_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonLinesStore::new(dir.path()));
        let importer = Arc::new(HarnessImporter::new(store.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let importer = Arc::clone(&importer);
                tokio::spawn(async move { importer.import_dated(KCP_RUN.as_bytes(), date()).await })
            })
            .collect();

        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().is_inserted() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.find_all("kcp_test").await.unwrap().len(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ImportOutcome::Inserted { variant: ProtocolVariant::Tcp, id: "abc".into() };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"outcome": "inserted", "variant": "tcp", "id": "abc"})
        );
    }
}
