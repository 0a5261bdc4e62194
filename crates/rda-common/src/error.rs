//! Error types for the RDA claim feed

use thiserror::Error;

/// Result type alias for RDA operations
pub type Result<T> = std::result::Result<T, RdaError>;

/// Main error type for RDA record sources, sinks and storage
#[derive(Error, Debug)]
pub enum RdaError {
    /// `next()` was called on a source that has no more records.
    #[error("No more records are available from this source")]
    Exhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// A failure part way through a batch run. `processed` counts the records
    /// the sink accepted before the failure.
    #[error("Processing failed after {processed} records: {source}")]
    Processing {
        processed: usize,
        source: Box<RdaError>,
    },

    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Call cancelled by client")]
    Cancelled,

    /// The call transport refused a message.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A primary failure plus errors raised while releasing resources afterwards.
    #[error("{primary} ({} suppressed)", suppressed.len())]
    WithSuppressed {
        primary: Box<RdaError>,
        suppressed: Vec<RdaError>,
    },
}

impl RdaError {
    /// Wraps a failure that happened after `processed` records were accepted.
    pub fn processing(processed: usize, cause: RdaError) -> Self {
        RdaError::Processing {
            processed,
            source: Box::new(cause),
        }
    }

    /// Splits a batch failure into the accepted count and its cause. Any
    /// other error counts as a failure before the first record.
    pub fn into_processing_parts(self) -> (usize, RdaError) {
        match self {
            RdaError::Processing { processed, source } => (processed, *source),
            other => (0, other),
        }
    }

    /// Attaches `suppressed` as a secondary error without replacing `self`.
    pub fn with_suppressed(self, suppressed: RdaError) -> Self {
        match self {
            RdaError::WithSuppressed {
                primary,
                suppressed: mut list,
            } => {
                list.push(suppressed);
                RdaError::WithSuppressed {
                    primary,
                    suppressed: list,
                }
            },
            other => RdaError::WithSuppressed {
                primary: Box::new(other),
                suppressed: vec![suppressed],
            },
        }
    }

    /// The error that caused the failure, looking through suppressed wrappers.
    pub fn primary(&self) -> &RdaError {
        match self {
            RdaError::WithSuppressed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    pub fn suppressed(&self) -> &[RdaError] {
        match self {
            RdaError::WithSuppressed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }
}

/// Combines the result of some work with the result of closing the resource
/// it used. A close error is reported only when the work itself succeeded;
/// otherwise it rides along as a suppressed error.
pub fn merge_close_result<T>(result: Result<T>, close: Result<()>) -> Result<T> {
    match (result, close) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_error)) => Err(close_error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(close_error)) => Err(error.with_suppressed(close_error)),
    }
}
