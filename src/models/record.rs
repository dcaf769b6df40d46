//! Test-run record schema shared by every protocol variant

use crate::types::{AppError, ProtocolVariant, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar measurement kept in the textual form the harness produced
///
/// Stored documents carry numbers as strings; a JSON number is accepted
/// as well and kept as its decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Metric(String);

impl Metric {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, if the text is a finite number
    pub fn as_f64(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Metric {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Metric {
    fn from(text: String) -> Self {
        Self(text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarRepr {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match ScalarRepr::deserialize(deserializer) {
            Ok(ScalarRepr::Text(text)) => Ok(Self(text)),
            Ok(ScalarRepr::Number(number)) => Ok(Self(number.to_string())),
            Err(_) => Err(serde::de::Error::custom("expected a string or number")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(serde_json::Number),
    ObjectId {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

/// Ids arrive as plain strings, numbers or extended-JSON `{"$oid": ..}`
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match IdRepr::deserialize(deserializer) {
        Ok(IdRepr::Text(text)) => Ok(text),
        Ok(IdRepr::Number(number)) => Ok(number.to_string()),
        Ok(IdRepr::ObjectId { oid }) => Ok(oid),
        Err(_) => Err(serde::de::Error::custom("record id must be a string, number or object id")),
    }
}

/// Extra fields, minus any that would shadow the record's own `id`
fn serialize_extra<S: Serializer>(extra: &BTreeMap<String, Value>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(extra.iter().filter(|(key, _)| key.as_str() != "id"))
}

/// One benchmark run of one transport implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRecord {
    /// Storage-assigned identifier
    #[serde(rename(deserialize = "_id", serialize = "id"), deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_length: Option<Metric>,
    /// Only carried by the redundancy variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_style: Option<Metric>,

    // Loss percentages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_loss: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream_loss: Option<Metric>,

    // Millisecond magnitudes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_latency: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream_latency: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_deviation: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream_deviation: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rtt: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rtt: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rtt: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_slap: Option<Metric>,

    // Byte counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_send_data: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_send_data: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_receive_data: Option<Metric>,

    // Packet counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_number: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_receive: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_send_udp_packet: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_receive_udp_packet: Option<Metric>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<Metric>,

    /// Per-packet RTT samples in send order
    #[serde(default)]
    pub rtt_data: Vec<Metric>,

    /// Fields written by newer harness versions
    #[serde(flatten, serialize_with = "serialize_extra")]
    pub extra: BTreeMap<String, Value>,
}

impl TestRunRecord {
    /// Create an empty record with the given id
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            library: None,
            packet_length: None,
            packet_style: None,
            upstream_loss: None,
            downstream_loss: None,
            upstream_latency: None,
            downstream_latency: None,
            upstream_deviation: None,
            downstream_deviation: None,
            average_rtt: None,
            max_rtt: None,
            total_rtt: None,
            send_slap: None,
            need_send_data: None,
            total_send_data: None,
            total_receive_data: None,
            total_number: None,
            total_receive: None,
            total_send_udp_packet: None,
            total_receive_udp_packet: None,
            time: None,
            time_stamp: None,
            rtt_data: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Listing projection; drops samples and byte/packet counters
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            library: self.library.clone(),
            upstream_loss: self.upstream_loss.clone(),
            upstream_latency: self.upstream_latency.clone(),
            upstream_deviation: self.upstream_deviation.clone(),
            downstream_loss: self.downstream_loss.clone(),
            downstream_latency: self.downstream_latency.clone(),
            downstream_deviation: self.downstream_deviation.clone(),
            send_slap: self.send_slap.clone(),
            average_rtt: self.average_rtt.clone(),
        }
    }

    /// Whether the sample count matches `totalReceive`
    ///
    /// `None` when `totalReceive` is absent or not an integer.
    pub fn sample_count_consistent(&self) -> Option<bool> {
        let expected = self.total_receive.as_ref()?.as_str().trim().parse::<usize>().ok()?;
        Some(expected == self.rtt_data.len())
    }
}

/// Reduced projection of a [`TestRunRecord`] for listing views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: String,
    pub library: Option<Metric>,
    pub upstream_loss: Option<Metric>,
    pub upstream_latency: Option<Metric>,
    pub upstream_deviation: Option<Metric>,
    pub downstream_loss: Option<Metric>,
    pub downstream_latency: Option<Metric>,
    pub downstream_deviation: Option<Metric>,
    pub send_slap: Option<Metric>,
    pub average_rtt: Option<Metric>,
}

/// Attribute names shared by every variant's schema
const COMMON_FIELDS: &[&str] = &[
    "_id",
    "library",
    "packetLength",
    "upstreamLoss",
    "downstreamLoss",
    "upstreamLatency",
    "downstreamLatency",
    "upstreamDeviation",
    "downstreamDeviation",
    "averageRtt",
    "maxRtt",
    "totalRtt",
    "sendSlap",
    "needSendData",
    "totalSendData",
    "totalReceiveData",
    "totalNumber",
    "totalReceive",
    "totalSendUdpPacket",
    "totalReceiveUdpPacket",
    "time",
    "timeStamp",
    "rttData",
];

/// Record schema of one protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    variant: ProtocolVariant,
}

impl RecordSchema {
    pub fn for_variant(variant: ProtocolVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Attribute names this variant's records may carry
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = COMMON_FIELDS.to_vec();
        if self.variant.carries_packet_style() {
            fields.push("packetStyle");
        }
        fields
    }

    /// Whether `name` belongs to this variant's field set
    pub fn knows(&self, name: &str) -> bool {
        name == "id" || self.fields().contains(&name)
    }

    /// Decode a stored document, validating it against the field set
    ///
    /// Unknown attributes are kept in [`TestRunRecord::extra`]; a
    /// `packetStyle` on a variant that does not carry one is treated the same.
    pub fn decode(&self, document: Value) -> Result<TestRunRecord> {
        let mut object: Map<String, Value> = match document {
            Value::Object(object) => object,
            other => {
                return Err(AppError::malformed_record(
                    self.variant.id(),
                    format!("expected a document object, found {}", json_kind(&other)),
                ))
            }
        };

        // `_id` wins; a bare `id` only stands in when `_id` is absent
        if !object.contains_key("_id") {
            if let Some(id) = object.remove("id") {
                object.insert("_id".to_string(), id);
            }
        }

        let id_hint = object
            .get("_id")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<missing id>".to_string());

        let mut record: TestRunRecord = serde_json::from_value(Value::Object(object)).map_err(|e| {
            AppError::malformed_record(self.variant.id(), format!("record {}: {}", id_hint, e))
        })?;

        if !self.variant.carries_packet_style() {
            if let Some(style) = record.packet_style.take() {
                record
                    .extra
                    .insert("packetStyle".to_string(), Value::String(style.as_str().to_string()));
            }
        }

        Ok(record)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kcp_document() -> Value {
        json!({
            "_id": "5c8f1a",
            "library": "kcp",
            "packetLength": "512",
            "upstreamLoss": "1",
            "downstreamLoss": "2",
            "upstreamLatency": "30",
            "downstreamLatency": "40",
            "upstreamDeviation": "5",
            "downstreamDeviation": "6",
            "averageRtt": "21.5",
            "maxRtt": "45",
            "sendSlap": "10",
            "needSendData": "2048",
            "totalSendData": "2048",
            "totalReceiveData": "2048",
            "totalNumber": "4",
            "totalReceive": "4",
            "totalSendUdpPacket": "4",
            "totalReceiveUdpPacket": "4",
            "time": "2019-04-01",
            "timeStamp": "1554076800",
            "rttData": ["5", "25", "44", "10"]
        })
    }

    #[test]
    fn test_decode_full_document() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Kcp);
        let record = schema.decode(kcp_document()).unwrap();

        assert_eq!(record.id, "5c8f1a");
        assert_eq!(record.library, Some(Metric::from("kcp")));
        assert_eq!(record.max_rtt.as_ref().unwrap().as_f64(), Some(45.0));
        assert_eq!(record.rtt_data.len(), 4);
        assert_eq!(record.sample_count_consistent(), Some(true));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_numbers_keep_textual_form() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Tcp);
        let record = schema
            .decode(json!({"_id": 7, "maxRtt": 45, "averageRtt": 12.5, "rttData": [1, "2"]}))
            .unwrap();

        assert_eq!(record.id, "7");
        assert_eq!(record.max_rtt.unwrap().as_str(), "45");
        assert_eq!(record.average_rtt.unwrap().as_str(), "12.5");
        assert_eq!(record.rtt_data, vec![Metric::from("1"), Metric::from("2")]);
    }

    #[test]
    fn test_object_id_form() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Enet);
        let record = schema
            .decode(json!({"_id": {"$oid": "5ca1ab1e0000000000000000"}}))
            .unwrap();
        assert_eq!(record.id, "5ca1ab1e0000000000000000");
    }

    #[test]
    fn test_unknown_fields_are_retained_not_rejected() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Kcp);
        let mut document = kcp_document();
        document["jitterHistogram"] = json!([1, 2, 3]);
        document["packetStyle"] = json!("reliable");

        let record = schema.decode(document).unwrap();
        assert!(record.packet_style.is_none());
        assert_eq!(record.extra.get("packetStyle"), Some(&json!("reliable")));
        assert_eq!(record.extra.get("jitterHistogram"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_stray_id_alongside_storage_id() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Tcp);
        let record = schema
            .decode(json!({"_id": "a", "id": "harness-7", "library": "tcp", "rttData": ["5"]}))
            .unwrap();

        assert_eq!(record.id, "a");
        assert_eq!(record.extra.get("id"), Some(&json!("harness-7")));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], json!("a"));
    }

    #[test]
    fn test_bare_id_used_when_storage_id_missing() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Kcp);
        let record = schema.decode(json!({"id": "k9", "library": "kcp"})).unwrap();
        assert_eq!(record.id, "k9");
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_redundancy_keeps_packet_style() {
        let schema = RecordSchema::for_variant(ProtocolVariant::MrtpRedundancy);
        let record = schema
            .decode(json!({"_id": "a", "packetStyle": "redundancy"}))
            .unwrap();
        assert_eq!(record.packet_style, Some(Metric::from("redundancy")));
        assert!(schema.knows("packetStyle"));
        assert!(!RecordSchema::for_variant(ProtocolVariant::Tcp).knows("packetStyle"));
    }

    #[test]
    fn test_malformed_documents() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Tcp);

        let not_object = schema.decode(json!(["a"])).unwrap_err();
        assert!(matches!(not_object, AppError::MalformedRecord { .. }));

        let missing_id = schema.decode(json!({"library": "tcp"})).unwrap_err();
        assert!(matches!(missing_id, AppError::MalformedRecord { .. }));

        let nested_metric = schema.decode(json!({"_id": "a", "maxRtt": {"v": 1}})).unwrap_err();
        assert!(matches!(nested_metric, AppError::MalformedRecord { ref variant, .. } if variant == "tcp"));

        let bad_samples = schema.decode(json!({"_id": "a", "rttData": "5,6"})).unwrap_err();
        assert!(matches!(bad_samples, AppError::MalformedRecord { .. }));
    }

    #[test]
    fn test_summary_projection() {
        let schema = RecordSchema::for_variant(ProtocolVariant::Kcp);
        let summary = schema.decode(kcp_document()).unwrap().summary();
        let json = serde_json::to_value(&summary).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 10);
        assert_eq!(object["id"], json!("5c8f1a"));
        assert_eq!(object["averageRtt"], json!("21.5"));
        for dropped in ["rttData", "totalSendData", "totalReceive", "maxRtt", "needSendData"] {
            assert!(!object.contains_key(dropped), "{} leaked into summary", dropped);
        }
    }

    #[test]
    fn test_sample_count_consistency() {
        let mut record = TestRunRecord::new("r");
        assert_eq!(record.sample_count_consistent(), None);

        record.total_receive = Some(Metric::from("3"));
        record.rtt_data = vec![Metric::from("1"), Metric::from("2")];
        assert_eq!(record.sample_count_consistent(), Some(false));
    }

    #[test]
    fn test_metric_numeric_view() {
        assert_eq!(Metric::from(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(Metric::from("abc").as_f64(), None);
        assert_eq!(Metric::from("NaN").as_f64(), None);
    }
}
