//! Latency histogram engine
//!
//! Turns a run's RTT samples into fixed-width buckets for bar charts, and
//! into an index-labelled series for the "all samples" view. Both are pure
//! functions of their input.

use crate::{
    error::{AppError, Result},
    models::{Metric, TestRunRecord},
};
use serde::{Deserialize, Serialize};

/// Width of one histogram bucket, in milliseconds
pub const BUCKET_WIDTH_MS: u64 = 20;

/// Width of the right-aligned index labels of the raw series
pub const RAW_LABEL_WIDTH: usize = 21;

/// Upper bound on buckets; a larger `maxRtt` is treated as corrupt
pub const MAX_BUCKETS: u64 = 1 << 20;

/// One histogram bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Lower edge with unit, e.g. `"40ms"`
    pub label: String,
    pub count: u64,
}

/// Fixed-width latency distribution of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub buckets: Vec<Bucket>,
    /// Samples beyond the last bucket, i.e. larger than the range implied by `maxRtt`
    pub overflow: u64,
}

impl Histogram {
    /// Samples placed in buckets
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Largest bucket count, 0 when there are no buckets
    pub fn peak(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0)
    }
}

/// One point of the raw sample series
///
/// `sample` is the stored text, `value` its parsed number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub label: String,
    pub sample: Metric,
    pub value: f64,
}

/// Parse one sample, rejecting negative and non-numeric values
pub fn parse_sample(field: &str, sample: &Metric) -> Result<f64> {
    match sample.as_f64() {
        Some(value) if value >= 0.0 => Ok(value),
        _ => Err(AppError::invalid_sample(field, sample.as_str())),
    }
}

fn parse_samples(rtt_data: &[Metric]) -> Result<Vec<f64>> {
    rtt_data
        .iter()
        .enumerate()
        .map(|(index, sample)| parse_sample(&format!("rttData[{}]", index), sample))
        .collect()
}

fn bucket_index(value: f64) -> u64 {
    (value / BUCKET_WIDTH_MS as f64).floor() as u64
}

/// Label for the bucket at `index`
pub fn bucket_label(index: u64) -> String {
    format!("{}ms", index * BUCKET_WIDTH_MS)
}

/// Bucket the samples into `floor(maxRtt / 20) + 1` bars
///
/// The bucket count follows the record's reported `maxRtt`, not the
/// largest sample. Without a `maxRtt` there are no buckets. Samples that
/// land past the last bucket are counted in [`Histogram::overflow`].
pub fn build_histogram(rtt_data: &[Metric], max_rtt: Option<&Metric>) -> Result<Histogram> {
    let samples = parse_samples(rtt_data)?;

    let bucket_count = match max_rtt {
        Some(max_rtt) => {
            let last = bucket_index(parse_sample("maxRtt", max_rtt)?);
            if last >= MAX_BUCKETS {
                return Err(AppError::invalid_sample("maxRtt", max_rtt.as_str()));
            }
            last + 1
        }
        None => 0,
    };

    let mut counts = vec![0u64; bucket_count as usize];
    let mut overflow = 0u64;
    for value in samples {
        match counts.get_mut(bucket_index(value) as usize) {
            Some(count) => *count += 1,
            None => overflow += 1,
        }
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| Bucket {
            label: bucket_label(index as u64),
            count,
        })
        .collect();

    Ok(Histogram { buckets, overflow })
}

/// One point per sample, in original order
pub fn build_raw_series(rtt_data: &[Metric]) -> Result<Vec<RawPoint>> {
    Ok(parse_samples(rtt_data)?
        .into_iter()
        .zip(rtt_data)
        .enumerate()
        .map(|(index, (value, sample))| RawPoint {
            label: format!("{:>width$}", index, width = RAW_LABEL_WIDTH),
            sample: sample.clone(),
            value,
        })
        .collect())
}

/// Histogram of a stored record, using its own samples and `maxRtt`
pub fn histogram_for(record: &TestRunRecord) -> Result<Histogram> {
    build_histogram(&record.rtt_data, record.max_rtt.as_ref())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[&str]) -> Vec<Metric> {
        values.iter().map(|v| Metric::from(*v)).collect()
    }

    fn counts(histogram: &Histogram) -> Vec<(&str, u64)> {
        histogram
            .buckets
            .iter()
            .map(|bucket| (bucket.label.as_str(), bucket.count))
            .collect()
    }

    #[test]
    fn test_reference_distribution() {
        let histogram = build_histogram(&samples(&["5", "25", "44", "10"]), Some(&Metric::from("45"))).unwrap();

        assert_eq!(counts(&histogram), vec![("0ms", 2), ("20ms", 1), ("40ms", 1)]);
        assert_eq!(histogram.total_count(), 4);
        assert_eq!(histogram.overflow, 0);
        assert_eq!(histogram.peak(), 2);
    }

    #[test]
    fn test_empty_buckets_are_reported() {
        let histogram = build_histogram(&samples(&["65"]), Some(&Metric::from("79"))).unwrap();
        assert_eq!(counts(&histogram), vec![("0ms", 0), ("20ms", 0), ("40ms", 0), ("60ms", 1)]);
    }

    #[test]
    fn test_bucket_edges() {
        let histogram = build_histogram(&samples(&["0", "19.99", "20", "40"]), Some(&Metric::from("40"))).unwrap();
        assert_eq!(counts(&histogram), vec![("0ms", 2), ("20ms", 1), ("40ms", 1)]);
    }

    #[test]
    fn test_empty_samples_with_max_rtt() {
        let histogram = build_histogram(&[], Some(&Metric::from("45"))).unwrap();
        assert_eq!(histogram.buckets.len(), 3);
        assert_eq!(histogram.total_count(), 0);
    }

    #[test]
    fn test_zero_max_rtt_yields_single_bucket() {
        let histogram = build_histogram(&samples(&["0"]), Some(&Metric::from("0"))).unwrap();
        assert_eq!(counts(&histogram), vec![("0ms", 1)]);
    }

    #[test]
    fn test_missing_max_rtt_yields_no_buckets() {
        let histogram = build_histogram(&samples(&["5", "6"]), None).unwrap();
        assert!(histogram.is_empty());
        assert_eq!(histogram.overflow, 2);
    }

    #[test]
    fn test_max_rtt_below_sample_maximum() {
        // maxRtt claims 30 but a sample reached 95
        let histogram = build_histogram(&samples(&["5", "25", "95"]), Some(&Metric::from("30"))).unwrap();
        assert_eq!(counts(&histogram), vec![("0ms", 1), ("20ms", 1)]);
        assert_eq!(histogram.overflow, 1);
        assert_eq!(histogram.total_count() + histogram.overflow, 3);
    }

    #[test]
    fn test_negative_sample_fails() {
        let err = build_histogram(&samples(&["5", "-3", "10"]), Some(&Metric::from("20"))).unwrap_err();
        match err {
            AppError::InvalidSample { field, value } => {
                assert_eq!(field, "rttData[1]");
                assert_eq!(value, "-3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_sample_fails_even_past_range() {
        let err = build_histogram(&samples(&["5", "abc"]), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidSample { .. }));
    }

    #[test]
    fn test_invalid_max_rtt_fails() {
        let err = build_histogram(&samples(&["5"]), Some(&Metric::from("n/a"))).unwrap_err();
        assert!(matches!(err, AppError::InvalidSample { ref field, .. } if field == "maxRtt"));
        assert!(build_histogram(&[], Some(&Metric::from("-1"))).is_err());
        assert!(build_histogram(&[], Some(&Metric::from("1e300"))).is_err());
    }

    #[test]
    fn test_raw_series_labels() {
        let series = build_raw_series(&samples(&["5", "25.5"])).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, format!("{}0", " ".repeat(20)));
        assert_eq!(series[1].label.len(), RAW_LABEL_WIDTH);
        assert!(series[1].label.ends_with('1'));
        assert_eq!(series[1].value, 25.5);
    }

    #[test]
    fn test_raw_series_keeps_stored_text() {
        let series = build_raw_series(&samples(&["25.50", "7"])).unwrap();
        assert_eq!(series[0].sample.as_str(), "25.50");
        assert_eq!(series[0].value, 25.5);

        let json = serde_json::to_value(&series[0]).unwrap();
        assert_eq!(json["sample"], serde_json::json!("25.50"));
    }

    #[test]
    fn test_raw_series_rejects_invalid_samples() {
        assert!(build_raw_series(&samples(&["1", "x"])).is_err());
        assert!(build_raw_series(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_histogram_for_record() {
        let mut record = TestRunRecord::new("r");
        record.max_rtt = Some(Metric::from("45"));
        record.rtt_data = samples(&["5", "25", "44", "10"]);
        assert_eq!(histogram_for(&record).unwrap().buckets.len(), 3);
    }

    #[test]
    fn test_histogram_serialized_shape() {
        let histogram = build_histogram(&samples(&["5"]), Some(&Metric::from("5"))).unwrap();
        let json = serde_json::to_value(&histogram).unwrap();
        assert_eq!(json, serde_json::json!({"buckets": [{"label": "0ms", "count": 1}], "overflow": 0}));
    }
}
