//! Error handling for the telemetry repository

use thiserror::Error;

/// Error taxonomy shared by the repository, histogram engine and query façade
#[derive(Error, Debug)]
pub enum AppError {
    /// Variant identifier outside the fixed set of transport implementations
    #[error("Unknown protocol variant: '{variant}'")]
    UnknownVariant { variant: String },

    /// Valid variant, but no record with that id in its partition
    #[error("Record '{id}' not found in {variant} partition")]
    RecordNotFound { variant: String, id: String },

    /// A negative or non-numeric RTT sample (or maxRtt value)
    #[error("Invalid RTT sample at {field}: '{value}'")]
    InvalidSample { field: String, value: String },

    /// An invalid sample attributed to the record that carried it
    #[error("Corrupt record '{id}' in {variant} partition")]
    CorruptRecord {
        variant: String,
        id: String,
        #[source]
        source: Box<AppError>,
    },

    /// Stored document does not match the variant's record schema
    #[error("Malformed record in {variant} partition: {reason}")]
    MalformedRecord { variant: String, reason: String },

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (JSON, CSV, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Harness result import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unknown_variant<S: Into<String>>(variant: S) -> Self {
        Self::UnknownVariant { variant: variant.into() }
    }

    pub fn record_not_found<V: Into<String>, I: Into<String>>(variant: V, id: I) -> Self {
        Self::RecordNotFound { variant: variant.into(), id: id.into() }
    }

    pub fn invalid_sample<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        Self::InvalidSample { field: field.into(), value: value.into() }
    }

    /// Attribute an engine error to a specific stored record
    pub fn corrupt_record<V: Into<String>, I: Into<String>>(variant: V, id: I, source: AppError) -> Self {
        Self::CorruptRecord {
            variant: variant.into(),
            id: id.into(),
            source: Box::new(source),
        }
    }

    pub fn malformed_record<V: Into<String>, R: Into<String>>(variant: V, reason: R) -> Self {
        Self::MalformedRecord { variant: variant.into(), reason: reason.into() }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new import error
    pub fn import<S: Into<String>>(message: S) -> Self {
        Self::Import(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownVariant { .. } => "VARIANT",
            Self::RecordNotFound { .. } => "NOT_FOUND",
            Self::InvalidSample { .. } => "SAMPLE",
            Self::CorruptRecord { .. } => "CORRUPT",
            Self::MalformedRecord { .. } => "SCHEMA",
            Self::Storage(_) => "STORAGE",
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Import(_) => "IMPORT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Errors caused by what the caller asked for rather than by stored data
    pub fn is_caller_defect(&self) -> bool {
        matches!(
            self,
            Self::UnknownVariant { .. } | Self::Config(_) | Self::Validation(_)
        )
    }

    /// Errors indicating damaged data upstream of the core
    pub fn is_data_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidSample { .. } | Self::CorruptRecord { .. } | Self::MalformedRecord { .. }
        )
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::UnknownVariant { variant } => {
                format!("'{}' is not a known protocol variant.\n\nSuggestion: Run 'nbt variants' to list the supported identifiers.", variant)
            }
            Self::RecordNotFound { variant, id } => {
                format!("No test run with id '{}' exists for {}.\n\nSuggestion: Run 'nbt list {}' to see the stored runs.", id, variant, variant)
            }
            Self::InvalidSample { field, value } => {
                format!("RTT sample {} has the value '{}', which is not a non-negative number.\n\nSuggestion: The stored run was damaged by the harness or loader; re-import it.", field, value)
            }
            Self::CorruptRecord { variant, id, source } => {
                format!("Test run '{}' in {} cannot be charted: {}\n\nSuggestion: Re-import the run from its harness CSV file.", id, variant, source)
            }
            Self::MalformedRecord { variant, reason } => {
                format!("A stored {} run does not match the record schema: {}\n\nSuggestion: Check the partition file for hand edits.", variant, reason)
            }
            Self::Storage(msg) => {
                format!("Storage failure: {}\n\nSuggestion: Check the data directory and try again.", msg)
            }
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the values passed on the command line.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::Import(msg) => {
                format!("Import failed: {}\n\nSuggestion: Check that the CSV file was produced by a supported harness.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::UnknownVariant { .. } => 2,
            Self::RecordNotFound { .. } => 3,
            Self::InvalidSample { .. } | Self::CorruptRecord { .. } | Self::MalformedRecord { .. } => 4,
            Self::Storage(_) | Self::Io(_) => 5,
            Self::Import(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if !use_color {
            return format!("[{}] {}", category, message);
        }

        use colored::Colorize;
        match self {
            Self::UnknownVariant { .. } | Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                format!("[{}] {}", category.red().bold(), message.red())
            }
            Self::RecordNotFound { .. } => {
                format!("[{}] {}", category.yellow().bold(), message.yellow())
            }
            Self::InvalidSample { .. } | Self::CorruptRecord { .. } | Self::MalformedRecord { .. } => {
                format!("[{}] {}", category.magenta().bold(), message.magenta())
            }
            Self::Storage(_) | Self::Io(_) | Self::Import(_) => {
                format!("[{}] {}", category.cyan().bold(), message.cyan())
            }
            Self::Internal(_) => {
                format!("[{}] {}", category.bright_red().bold(), message.bright_red())
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        Self::import(format!("CSV read error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user feedback on the console
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error, its cause chain and (in verbose mode) a hint
    pub fn render(&self, error: &AppError) -> String {
        let mut lines = vec![error.format_for_console(self.use_color)];

        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            lines.push(format!("Caused by: {}", cause));
            source = cause.source();
        }

        if self.verbose {
            lines.push(String::new());
            lines.push(error.user_friendly_message());
        }

        lines.join("\n")
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}
