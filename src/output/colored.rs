//! Colored formatter implementation with terminal color support
//!
//! Latency values are colored by how slow they are, loss values by how
//! much was lost. Tables are laid out by [`PlainFormatter`] and decorated
//! afterwards.

use crate::{
    error::Result,
    histogram::Histogram,
    ingest::ImportOutcome,
    models::{RecordSummary, TestRunRecord},
    query::{RecordDetail, VariantCount},
    registry::VariantInfo,
};
use super::formatter::{
    bar_length, detail_header_lines, fmt_err, summary_table, FormattingOptions, OutputFormatter, PlainFormatter,
};
use std::fmt::Write as _;
use colored::*;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Excellent,  // < 50ms
    Good,       // 50-100ms
    Fair,       // 100-300ms
    Poor,       // 300-1000ms
    VeryPoor,   // > 1000ms
}

impl LatencyLevel {
    /// Determine latency level from a round-trip time in milliseconds
    pub fn from_rtt(rtt_ms: f64) -> Self {
        if rtt_ms < 50.0 {
            Self::Excellent
        } else if rtt_ms < 100.0 {
            Self::Good
        } else if rtt_ms < 300.0 {
            Self::Fair
        } else if rtt_ms < 1000.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Get color for this latency level
    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Apply dimmed formatting if colors are enabled
    fn dimmed(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.dimmed()
        } else {
            text.normal()
        }
    }

    /// Bold header-colored text if colors are enabled
    fn heading(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(self.color_scheme.header)
        } else {
            text.normal()
        }
    }

    /// Color a `<value>ms` cell by latency level
    fn latency_cell(&self, cell: &str) -> ColoredString {
        match cell.trim().trim_end_matches("ms").parse::<f64>() {
            Ok(ms) => self.colorize(cell, LatencyLevel::from_rtt(ms).color()),
            Err(_) => self.dimmed(cell),
        }
    }

    /// Color a `<value>%` cell by loss
    fn loss_cell(&self, cell: &str) -> ColoredString {
        let color = match cell.trim().trim_end_matches('%').parse::<f64>() {
            Ok(loss) if loss <= 0.0 => self.color_scheme.success,
            Ok(loss) if loss < 5.0 => self.color_scheme.warning,
            Ok(_) => self.color_scheme.error,
            Err(_) => return self.dimmed(cell),
        };
        self.colorize(cell, color)
    }

    fn decorate_cell(&self, cell: &str) -> String {
        let trimmed = cell.trim();
        if trimmed.ends_with('%') {
            self.loss_cell(cell).to_string()
        } else if trimmed.ends_with("ms") {
            self.latency_cell(cell).to_string()
        } else if trimmed == "-" {
            self.dimmed(cell).to_string()
        } else {
            cell.to_string()
        }
    }

    /// Colored run listing; cells are padded before coloring so columns stay aligned
    fn colored_summary_table(&self, summaries: &[RecordSummary]) -> String {
        let (format, rows) = summary_table(summaries, self.options.verbose_mode, false);
        let table = self.plain_formatter.create_table(&format, &rows);
        let mut lines = table.lines();

        let mut output = String::new();
        if let Some(header) = lines.next() {
            output.push_str(&self.bold(header).to_string());
            output.push('\n');
            output.push_str(&self.colorize(&"─".repeat(header.chars().count()), self.color_scheme.border).to_string());
            output.push('\n');
        }

        for line in lines {
            // Columns are separated by two spaces and never contain two spaces themselves
            let cells: Vec<String> = split_cells(line).iter().map(|cell| self.decorate_cell(cell)).collect();
            output.push_str(&cells.concat());
            output.push('\n');
        }
        output
    }

    fn histogram_chart(&self, histogram: &Histogram) -> String {
        let label_width = histogram.buckets.iter().map(|b| b.label.len()).max().unwrap_or(0);
        let peak = histogram.peak();

        let mut output = String::new();
        for (index, bucket) in histogram.buckets.iter().enumerate() {
            let length = bar_length(bucket.count, peak, self.options.bar_width);
            let level = LatencyLevel::from_rtt((index as u64 * crate::histogram::BUCKET_WIDTH_MS) as f64);
            let count = if bucket.count == 0 {
                self.dimmed("0").to_string()
            } else {
                self.bold(&bucket.count.to_string()).to_string()
            };
            let _ = writeln!(
                output,
                "{:>width$} {} {}{}{}",
                bucket.label,
                self.colorize("│", self.color_scheme.border),
                self.colorize(&"█".repeat(length), level.color()),
                if length > 0 { " " } else { "" },
                count,
                width = label_width
            );
        }
        output
    }

    fn header_lines(&self, record: &TestRunRecord) -> String {
        detail_header_lines(record)
            .into_iter()
            .map(|(label, value)| {
                let label = format!("{:<20}", format!("{}:", label));
                format!("{} {}\n", self.colorize(&label, self.color_scheme.info), self.decorate_cell(&value))
            })
            .collect()
    }
}

/// Split a borderless table row back into padded cells, keeping the padding
fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_gap = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        let gap_start = c == ' ' && chars.peek() == Some(&' ');
        if gap_start && !current.trim().is_empty() && !in_gap {
            in_gap = true;
        }
        if in_gap && c != ' ' {
            cells.push(std::mem::take(&mut current));
            in_gap = false;
        }
        current.push(c);
    }
    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err("header"))?;
        writeln!(output, "  {}  ", self.heading(title)).map_err(fmt_err("header"))?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err("header"))?;

        Ok(output)
    }

    fn format_variants(&self, variants: &[VariantInfo]) -> Result<String> {
        let mut output = String::new();
        for info in variants {
            writeln!(
                output,
                "{} {} {}",
                self.bold(&format!("{:<24}", info.id)),
                self.dimmed(&format!("{:<28}", info.partition)),
                info.title
            )
            .map_err(fmt_err("variants"))?;
        }
        Ok(output)
    }

    fn format_overview(&self, overview: &[VariantCount]) -> Result<String> {
        let mut output = String::new();
        let peak = overview.iter().map(|entry| entry.count as u64).max().unwrap_or(0);

        for entry in overview {
            let length = bar_length(entry.count as u64, peak, self.options.bar_width / 2);
            writeln!(
                output,
                "{} {:>6} {}",
                self.bold(&format!("{:<24}", entry.variant.id)),
                entry.count,
                self.colorize(&"█".repeat(length), self.color_scheme.info)
            )
            .map_err(fmt_err("overview"))?;
        }

        let total: usize = overview.iter().map(|entry| entry.count).sum();
        writeln!(output, "Total runs: {}", self.bold(&total.to_string())).map_err(fmt_err("overview"))?;
        Ok(output)
    }

    fn format_summaries(&self, variant: &VariantInfo, summaries: &[RecordSummary]) -> Result<String> {
        let mut output = self.format_header(variant.title)?;
        output.push_str("\n\n");

        if summaries.is_empty() {
            writeln!(output, "{}", self.dimmed(&format!("No runs stored for {}", variant.id)))
                .map_err(fmt_err("summaries"))?;
            return Ok(output);
        }

        output.push_str(&self.colored_summary_table(summaries));
        writeln!(output, "{} runs", self.bold(&summaries.len().to_string())).map_err(fmt_err("summaries"))?;
        Ok(output)
    }

    fn format_detail(&self, detail: &RecordDetail, show_raw: bool) -> Result<String> {
        let mut output = self.format_header(&format!("{} - {}", detail.variant.title, detail.record.id))?;
        output.push_str("\n\n");
        output.push_str(&self.header_lines(&detail.record));

        writeln!(
            output,
            "\n{} ({} samples)",
            self.heading("Latency distribution"),
            detail.record.rtt_data.len()
        )
        .map_err(fmt_err("detail"))?;

        if detail.histogram.is_empty() {
            writeln!(output, "{}", self.dimmed("(no buckets: the run reports no maxRtt)")).map_err(fmt_err("detail"))?;
        } else {
            output.push_str(&self.histogram_chart(&detail.histogram));
        }
        if detail.histogram.overflow > 0 {
            writeln!(output, "{}", self.format_warning(&format!(
                "{} samples lie beyond maxRtt",
                detail.histogram.overflow
            ))?)
            .map_err(fmt_err("detail"))?;
        }

        if show_raw {
            writeln!(output, "\n{}", self.heading("All samples")).map_err(fmt_err("detail"))?;
            for point in &detail.raw_series {
                writeln!(
                    output,
                    "{} {}",
                    self.dimmed(&point.label),
                    self.latency_cell(&format!("{}ms", point.sample))
                )
                .map_err(fmt_err("detail"))?;
            }
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
        Ok(format!("{} {}", self.colorize("⚠", self.color_scheme.warning), self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✓", self.color_scheme.success), self.colorize(message, self.color_scheme.success)))
    }
}
