//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! plain text and JSON implementations.

use crate::{
    error::{AppError, Result},
    histogram::{Histogram, RawPoint},
    ingest::ImportOutcome,
    models::{Metric, RecordSummary, TestRunRecord},
    query::{RecordDetail, VariantCount},
    registry::VariantInfo,
};
use serde::Serialize;
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the variant catalogue
    fn format_variants(&self, variants: &[VariantInfo]) -> Result<String>;

    /// Format per-variant record counts
    fn format_overview(&self, overview: &[VariantCount]) -> Result<String>;

    /// Format the run listing of one variant
    fn format_summaries(&self, variant: &VariantInfo, summaries: &[RecordSummary]) -> Result<String>;

    /// Format one run with its histogram, optionally with every sample
    fn format_detail(&self, detail: &RecordDetail, show_raw: bool) -> Result<String>;

    /// Format the outcome of a harness import
    fn format_import(&self, outcome: &ImportOutcome) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with extra columns
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Width of the longest histogram bar
    pub bar_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            bar_width: 50,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    pub fn left(header: &str, max_width: usize) -> Self {
        Self { header: header.to_string(), alignment: Alignment::Left, max_width }
    }

    pub fn right(header: &str, max_width: usize) -> Self {
        Self { header: header.to_string(), alignment: Alignment::Right, max_width }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// A metric followed by its unit, or `-` when the run did not report it
pub(crate) fn with_unit(metric: Option<&Metric>, unit: &str) -> String {
    match metric {
        Some(metric) => format!("{}{}", metric.as_str(), unit),
        None => "-".to_string(),
    }
}

/// `label: value` lines shown above the charts of a run
pub(crate) fn detail_header_lines(record: &TestRunRecord) -> Vec<(&'static str, String)> {
    vec![
        ("upstreamLoss", with_unit(record.upstream_loss.as_ref(), "%")),
        ("upstreamLatency", with_unit(record.upstream_latency.as_ref(), "ms")),
        ("upstreamDeviation", with_unit(record.upstream_deviation.as_ref(), "ms")),
        ("downstreamLoss", with_unit(record.downstream_loss.as_ref(), "%")),
        ("downstreamLatency", with_unit(record.downstream_latency.as_ref(), "ms")),
        ("downstreamDeviation", with_unit(record.downstream_deviation.as_ref(), "ms")),
        ("averageRtt", with_unit(record.average_rtt.as_ref(), "ms")),
        ("maxRtt", with_unit(record.max_rtt.as_ref(), "ms")),
        ("sendSlap", with_unit(record.send_slap.as_ref(), "ms")),
        ("needSendData", with_unit(record.need_send_data.as_ref(), "bytes")),
        ("totalSendData", with_unit(record.total_send_data.as_ref(), "bytes")),
        ("totalReceiveData", with_unit(record.total_receive_data.as_ref(), "bytes")),
        ("totalNumber", with_unit(record.total_number.as_ref(), "")),
        ("totalReceive", with_unit(record.total_receive.as_ref(), "")),
    ]
}

/// Bar length for `count`, scaled so that `peak` fills `width`
pub(crate) fn bar_length(count: u64, peak: u64, width: usize) -> usize {
    if peak == 0 || count == 0 {
        return 0;
    }
    let scaled = (count as f64 / peak as f64 * width as f64).round() as usize;
    scaled.max(1)
}

/// Columns and rows of the run listing
pub(crate) fn summary_table(summaries: &[RecordSummary], verbose: bool, show_borders: bool) -> (TableFormat, Vec<RowData>) {
    let mut columns = vec![
        Column::left("id", 32),
        Column::left("library", 12),
        Column::right("upstreamLoss", 16),
        Column::right("upstreamLatency", 16),
        Column::right("upstreamDeviation", 18),
        Column::right("downstreamLoss", 16),
        Column::right("downstreamLatency", 18),
        Column::right("downstreamDeviation", 20),
    ];
    if verbose {
        columns.push(Column::right("sendSlap", 12));
        columns.push(Column::right("averageRtt", 12));
    }

    let rows = summaries
        .iter()
        .map(|summary| {
            let mut row = vec![
                summary.id.clone(),
                with_unit(summary.library.as_ref(), ""),
                with_unit(summary.upstream_loss.as_ref(), "%"),
                with_unit(summary.upstream_latency.as_ref(), "ms"),
                with_unit(summary.upstream_deviation.as_ref(), "ms"),
                with_unit(summary.downstream_loss.as_ref(), "%"),
                with_unit(summary.downstream_latency.as_ref(), "ms"),
                with_unit(summary.downstream_deviation.as_ref(), "ms"),
            ];
            if verbose {
                row.push(with_unit(summary.send_slap.as_ref(), "ms"));
                row.push(with_unit(summary.average_rtt.as_ref(), "ms"));
            }
            row
        })
        .collect();

    (TableFormat { columns, show_borders, show_header: true }, rows)
}

pub(super) fn fmt_err(context: &str) -> impl Fn(std::fmt::Error) -> AppError + '_ {
    move |e| AppError::io(format!("Failed to format {}: {}", context, e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        let column_widths = self.calculate_column_widths(format, rows);

        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format));
            output.push('\n');
        }

        if format.show_borders && !rows.is_empty() {
            output.push_str(&self.create_horizontal_border(&column_widths));
            output.push('\n');
        }

        output
    }

    /// Calculate optimal column widths
    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(col_idx, column)| {
                let content = rows
                    .iter()
                    .filter_map(|row| row.get(col_idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                content.max(column.header.len()).min(column.max_width)
            })
            .collect()
    }

    /// Create a table row
    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format
                .columns
                .get(idx)
                .map(|column| &column.alignment)
                .unwrap_or(&Alignment::Left);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&self.align_text(cell, width, alignment));
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Create horizontal border for table
    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Align text within specified width
    fn align_text(&self, text: &str, width: usize, alignment: &Alignment) -> String {
        let length = text.chars().count();
        if length >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - length;
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        }
    }

    /// Text bar chart of a histogram
    pub(crate) fn histogram_chart(&self, histogram: &Histogram, bar: char) -> String {
        let label_width = histogram
            .buckets
            .iter()
            .map(|bucket| bucket.label.len())
            .max()
            .unwrap_or(0);
        let peak = histogram.peak();

        let mut output = String::new();
        for bucket in &histogram.buckets {
            let length = bar_length(bucket.count, peak, self.options.bar_width);
            let line = format!(
                "{:>width$} | {}{}{}",
                bucket.label,
                bar.to_string().repeat(length),
                if length > 0 { " " } else { "" },
                bucket.count,
                width = label_width
            );
            output.push_str(line.trim_end());
            output.push('\n');
        }
        output
    }

    /// Every sample, one per line, under its right-aligned index label
    pub(crate) fn raw_series(&self, series: &[RawPoint]) -> String {
        series
            .iter()
            .map(|point| format!("{} {}ms\n", point.label, point.sample))
            .collect()
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err("header"))?;
        writeln!(output, "  {}  ", title).map_err(fmt_err("header"))?;
        write!(output, "{}", border).map_err(fmt_err("header"))?;

        Ok(output)
    }

    fn format_variants(&self, variants: &[VariantInfo]) -> Result<String> {
        let format = TableFormat {
            columns: vec![
                Column::left("variant", 24),
                Column::left("partition", 32),
                Column::left("title", 40),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };
        let rows: Vec<RowData> = variants
            .iter()
            .map(|info| vec![info.id.to_string(), info.partition.to_string(), info.title.to_string()])
            .collect();

        Ok(self.create_table(&format, &rows))
    }

    fn format_overview(&self, overview: &[VariantCount]) -> Result<String> {
        let format = TableFormat {
            columns: vec![Column::left("variant", 24), Column::right("runs", 10)],
            show_borders: self.options.table_borders,
            show_header: true,
        };
        let rows: Vec<RowData> = overview
            .iter()
            .map(|entry| vec![entry.variant.id.to_string(), entry.count.to_string()])
            .collect();

        let mut output = self.create_table(&format, &rows);
        let total: usize = overview.iter().map(|entry| entry.count).sum();
        writeln!(output, "Total runs: {}", total).map_err(fmt_err("overview"))?;
        Ok(output)
    }

    fn format_summaries(&self, variant: &VariantInfo, summaries: &[RecordSummary]) -> Result<String> {
        let mut output = self.format_header(variant.title)?;
        output.push_str("\n\n");

        if summaries.is_empty() {
            writeln!(output, "No runs stored for {}", variant.id).map_err(fmt_err("summaries"))?;
            return Ok(output);
        }

        let (format, rows) = summary_table(summaries, self.options.verbose_mode, self.options.table_borders);
        output.push_str(&self.create_table(&format, &rows));
        writeln!(output, "{} runs", summaries.len()).map_err(fmt_err("summaries"))?;
        Ok(output)
    }

    fn format_detail(&self, detail: &RecordDetail, show_raw: bool) -> Result<String> {
        let mut output = self.format_header(&format!("{} - {}", detail.variant.title, detail.record.id))?;
        output.push_str("\n\n");

        for (label, value) in detail_header_lines(&detail.record) {
            writeln!(output, "{}: {}", label, value).map_err(fmt_err("detail"))?;
        }

        writeln!(output, "\nLatency distribution ({} samples):", detail.record.rtt_data.len())
            .map_err(fmt_err("detail"))?;
        if detail.histogram.is_empty() {
            writeln!(output, "(no buckets: the run reports no maxRtt)").map_err(fmt_err("detail"))?;
        } else {
            output.push_str(&self.histogram_chart(&detail.histogram, '#'));
        }
        if detail.histogram.overflow > 0 {
            writeln!(output, "{} samples lie beyond maxRtt", detail.histogram.overflow)
                .map_err(fmt_err("detail"))?;
        }

        if show_raw {
            writeln!(output, "\nAll samples:").map_err(fmt_err("detail"))?;
            output.push_str(&self.raw_series(&detail.raw_series));
        }

        Ok(output)
    }

    fn format_import(&self, outcome: &ImportOutcome) -> Result<String> {
        match outcome {
            ImportOutcome::Inserted { variant, id } => {
                self.format_success(&format!("Imported {} run as {}", variant, id))
            }
            ImportOutcome::Duplicate { variant, time_stamp } => self.format_warning(&format!(
                "Skipped {} run: timeStamp {} is already stored",
                variant, time_stamp
            )),
        }
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

/// JSON formatter for consumption by other tools
///
/// Every method emits one pretty-printed JSON document; field names follow
/// the stored records (camelCase).
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_header(&self, _title: &str) -> Result<String> {
        Ok(String::new())
    }

    fn format_variants(&self, variants: &[VariantInfo]) -> Result<String> {
        self.render(variants)
    }

    fn format_overview(&self, overview: &[VariantCount]) -> Result<String> {
        self.render(overview)
    }

    fn format_summaries(&self, _variant: &VariantInfo, summaries: &[RecordSummary]) -> Result<String> {
        self.render(summaries)
    }

    fn format_detail(&self, detail: &RecordDetail, show_raw: bool) -> Result<String> {
        if show_raw {
            return self.render(detail);
        }

        #[derive(Serialize)]
        struct Chart<'a> {
            variant: &'a VariantInfo,
            record: &'a TestRunRecord,
            histogram: &'a Histogram,
        }

        self.render(&Chart {
            variant: &detail.variant,
            record: &detail.record,
            histogram: &detail.histogram,
        })
    }

    fn format_import(&self, outcome: &ImportOutcome) -> Result<String> {
        self.render(outcome)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        self.render(&serde_json::json!({ "warning": warning }))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        self.render(&serde_json::json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::build_histogram;
    use crate::types::ProtocolVariant;

    fn plain() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions { enable_color: false, ..Default::default() })
    }

    fn summary(id: &str) -> RecordSummary {
        let mut record = TestRunRecord::new(id);
        record.library = Some(Metric::from("kcp"));
        record.upstream_loss = Some(Metric::from("0.5"));
        record.upstream_latency = Some(Metric::from("12"));
        record.average_rtt = Some(Metric::from("24"));
        record.summary()
    }

    fn detail() -> RecordDetail {
        let mut record = TestRunRecord::new("k1");
        record.max_rtt = Some(Metric::from("45"));
        record.need_send_data = Some(Metric::from("1024"));
        record.rtt_data = ["5", "25", "44", "10"].iter().map(|s| Metric::from(*s)).collect();
        let histogram = build_histogram(&record.rtt_data, record.max_rtt.as_ref()).unwrap();
        let raw_series = crate::histogram::build_raw_series(&record.rtt_data).unwrap();
        RecordDetail {
            variant: VariantInfo::from(ProtocolVariant::Kcp),
            record,
            histogram,
            raw_series,
        }
    }

    #[test]
    fn test_with_unit() {
        assert_eq!(with_unit(Some(&Metric::from("0.5")), "%"), "0.5%");
        assert_eq!(with_unit(None, "ms"), "-");
    }

    #[test]
    fn test_bar_length() {
        assert_eq!(bar_length(0, 10, 50), 0);
        assert_eq!(bar_length(10, 10, 50), 50);
        assert_eq!(bar_length(1, 1000, 50), 1);
        assert_eq!(bar_length(5, 0, 50), 0);
    }

    #[test]
    fn test_align_text() {
        let formatter = plain();
        assert_eq!(formatter.align_text("ab", 4, &Alignment::Left), "ab  ");
        assert_eq!(formatter.align_text("ab", 4, &Alignment::Right), "  ab");
        assert_eq!(formatter.align_text("abcdef", 3, &Alignment::Left), "abc");
    }

    #[test]
    fn test_summary_table_columns_and_units() {
        let output = plain()
            .format_summaries(&VariantInfo::from(ProtocolVariant::Kcp), &[summary("a1"), summary("b2")])
            .unwrap();

        assert!(output.contains("KCP Test Data"));
        assert!(output.contains("upstreamLoss"));
        assert!(output.contains("0.5%"));
        assert!(output.contains("12ms"));
        assert!(!output.contains("averageRtt"));
        assert!(output.contains("2 runs"));

        let first = output.find("a1").unwrap();
        let second = output.find("b2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_verbose_summary_adds_columns() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
            ..Default::default()
        });
        let output = formatter
            .format_summaries(&VariantInfo::from(ProtocolVariant::Kcp), &[summary("a1")])
            .unwrap();
        assert!(output.contains("averageRtt"));
        assert!(output.contains("24ms"));
    }

    #[test]
    fn test_empty_listing() {
        let output = plain().format_summaries(&VariantInfo::from(ProtocolVariant::Enet), &[]).unwrap();
        assert!(output.contains("No runs stored for enet"));
    }

    #[test]
    fn test_detail_output() {
        let output = plain().format_detail(&detail(), false).unwrap();

        assert!(output.contains("maxRtt: 45ms"));
        assert!(output.contains("needSendData: 1024bytes"));
        assert!(output.contains("upstreamLoss: -"));
        assert!(output.contains("0ms | "));
        assert!(output.contains("20ms | "));
        assert!(!output.contains("All samples"));

        let with_raw = plain().format_detail(&detail(), true).unwrap();
        assert!(with_raw.contains("All samples"));
        assert!(with_raw.contains("44ms"));
    }

    #[test]
    fn test_histogram_chart_scales_to_peak() {
        let formatter = PlainFormatter::new(FormattingOptions { bar_width: 10, ..Default::default() });
        let chart = formatter.histogram_chart(&detail().histogram, '#');
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], " 0ms | ########## 2");
        assert_eq!(lines[1], "20ms | ##### 1");
    }

    #[test]
    fn test_import_messages() {
        let formatter = plain();
        let inserted = ImportOutcome::Inserted { variant: ProtocolVariant::Tcp, id: "abc".into() };
        assert_eq!(formatter.format_import(&inserted).unwrap(), "SUCCESS: Imported tcp run as abc");

        let duplicate = ImportOutcome::Duplicate { variant: ProtocolVariant::Tcp, time_stamp: "17".into() };
        assert!(formatter.format_import(&duplicate).unwrap().starts_with("WARNING:"));
    }

    #[test]
    fn test_overview_total() {
        let overview = vec![
            VariantCount { variant: VariantInfo::from(ProtocolVariant::Tcp), count: 2 },
            VariantCount { variant: VariantInfo::from(ProtocolVariant::Kcp), count: 3 },
        ];
        let output = plain().format_overview(&overview).unwrap();
        assert!(output.contains("Total runs: 5"));
    }

    #[test]
    fn test_json_detail_omits_raw_series_unless_asked() {
        let formatter = JsonFormatter::new();
        let compact: serde_json::Value = serde_json::from_str(&formatter.format_detail(&detail(), false).unwrap()).unwrap();
        assert!(compact.get("rawSeries").is_none());
        assert_eq!(compact["histogram"]["buckets"].as_array().unwrap().len(), 3);

        let full: serde_json::Value = serde_json::from_str(&formatter.format_detail(&detail(), true).unwrap()).unwrap();
        assert_eq!(full["rawSeries"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_plain_raw_series_prints_stored_text() {
        let series = crate::histogram::build_raw_series(&[Metric::from("25.50"), Metric::from("3")]).unwrap();
        let output = plain().raw_series(&series);
        assert!(output.contains(" 0 25.50ms\n"));
        assert!(output.contains(" 1 3ms\n"));
    }

    #[test]
    fn test_json_summaries() {
        let output = JsonFormatter::new()
            .format_summaries(&VariantInfo::from(ProtocolVariant::Kcp), &[summary("a1")])
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["id"], "a1");
        assert_eq!(parsed[0]["upstreamLoss"], "0.5");
        assert!(parsed[0].get("rttData").is_none());
    }
}
