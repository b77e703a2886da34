//! Fatal error types.
//!
//! Anything that does not abort a document is reported as a
//! [`Diagnostic`](crate::edgar::parsing::Diagnostic) instead.

use thiserror::Error;

/// Result type for fact extraction and calendar operations.
pub type Result<T> = std::result::Result<T, FactsError>;

/// Errors that abort the current operation.
#[derive(Debug, Error)]
pub enum FactsError {
    /// The document markup could not be parsed at all
    #[error("Failed to parse document {document}: {message}")]
    DocumentParse {
        /// Name of the failing document
        document: String,
        /// Parser message
        message: String,
    },

    /// A calendar configuration entry is out of range
    #[error("Invalid fiscal calendar for {identifier}: {reason}")]
    InvalidCalendar {
        /// Company identifier of the rejected entry
        identifier: String,
        /// Why the entry was rejected
        reason: String,
    },

    /// Calendar configuration source is not valid JSON of the expected shape
    #[error("Invalid calendar source {path}: {source}")]
    CalendarSource {
        /// Path of the calendar file
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FactsError {
    pub(crate) fn document_parse(document: &str, message: impl ToString) -> Self {
        Self::DocumentParse {
            document: document.to_string(),
            message: message.to_string(),
        }
    }
}
