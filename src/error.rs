//! Error types for the time-off form filler

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Document-level failures that abort a fill.
///
/// Field-level anomalies (unnamed widgets, malformed names, missing
/// rectangles) are not errors; they are reported through
/// [`crate::pdf::SkippedField`].
#[derive(Error, Debug)]
pub enum Error {
    /// Template path does not exist
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Template exists but could not be parsed as a PDF
    #[error("Template unreadable: {origin}: {source}")]
    TemplateUnreadable {
        /// Path of the template, or `<memory>` for byte input
        origin: String,
        #[source]
        source: lopdf::Error,
    },

    /// Template has no pages to fill
    #[error("Template has no pages")]
    EmptyTemplate,

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Destination could not be written
    #[error("Failed to write output {}: {source}", .path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw `NAME=VALUE` assignment could not be parsed
    #[error("Invalid field assignment: {0}")]
    InvalidFieldAssignment(String),
}
