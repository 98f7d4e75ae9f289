use thiserror::Error;

/// Result type for mamoscan operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Document-level errors
///
/// Any of these aborts the whole conversion. Problems confined to a single
/// exam are reported as [`ReviewReason`](crate::types::ReviewReason)s on the
/// record instead.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The byte stream is not a readable report document
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    /// The document is valid but contains no exam sections
    #[error("Document contains no exam sections")]
    EmptyDocument,

    /// Layout template could not be loaded or is inconsistent
    #[error("Invalid layout template: {0}")]
    InvalidTemplate(String),

    /// Audit image export could not be set up
    #[error("Export error: {0}")]
    Export(String),

    /// Per-section worker pool could not be started
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Tabular output could not be produced
    #[error("Output error: {0}")]
    Output(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConversionError {
    /// Stable reason code handed to the upload/download layer
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::UnreadableDocument(_) => "UNREADABLE_DOCUMENT",
            ConversionError::EmptyDocument => "EMPTY_DOCUMENT",
            ConversionError::InvalidTemplate(_) => "INVALID_TEMPLATE",
            ConversionError::Export(_) => "EXPORT_FAILED",
            ConversionError::WorkerPool(_) => "WORKER_POOL",
            ConversionError::Output(_) => "OUTPUT_FAILED",
            ConversionError::IoError(_) => "IO_ERROR",
        }
    }
}

// Convert lopdf errors
impl From<lopdf::Error> for ConversionError {
    fn from(e: lopdf::Error) -> Self {
        ConversionError::UnreadableDocument(format!("{}", e))
    }
}

impl From<crate::audit::RenderError> for ConversionError {
    fn from(e: crate::audit::RenderError) -> Self {
        ConversionError::Export(format!("{}", e))
    }
}

impl From<csv::Error> for ConversionError {
    fn from(e: csv::Error) -> Self {
        ConversionError::Output(format!("{}", e))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for ConversionError {
    fn from(e: serde_json::Error) -> Self {
        ConversionError::Output(format!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_distinguish_document_failures() {
        let unreadable = ConversionError::UnreadableDocument("bad xref".to_string());
        let empty = ConversionError::EmptyDocument;

        assert_eq!(unreadable.code(), "UNREADABLE_DOCUMENT");
        assert_eq!(empty.code(), "EMPTY_DOCUMENT");
        assert_ne!(unreadable.code(), empty.code());
        assert!(unreadable.to_string().contains("bad xref"));
    }
}
