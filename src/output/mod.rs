//! Output formatting and display system
//!
//! Command results are rendered through an [`OutputFormatter`]: aligned
//! plain-text tables, the same decorated with terminal colors, or JSON
//! documents for other tools.

mod formatter;
mod colored;

pub use self::formatter::{
    OutputFormatter,
    PlainFormatter,
    JsonFormatter,
    TableFormat,
    FormattingOptions,
    Column,
    Alignment,
    RowData,
};
pub use self::colored::{
    ColoredFormatter,
    ColorScheme,
    LatencyLevel,
};

use crate::{models::Config, types::OutputFormat};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter for the requested format and color support
    pub fn create_formatter(format: OutputFormat, enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        if format == OutputFormat::Json {
            return Box::new(JsonFormatter::new());
        }

        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create the formatter a configuration asks for
    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.output_format, config.enable_color, config.verbose)
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(OutputFormat::Table, false, false)
    }
}
