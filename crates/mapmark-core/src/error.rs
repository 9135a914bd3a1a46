//! Error type for configuration and construction failures.
//!
//! Recoverable conditions (duplicate ids, unknown features, mismatched mode
//! kinds) are logged and degrade to a no-op; only the cases below are
//! returned to the caller.

use crate::features::SourceName;
use thiserror::Error;

/// Errors raised by the annotation core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to create the source: \"{0}\"")]
    SourceCreation(SourceName),
    #[error("Missing source: \"{0}\"")]
    MissingSource(SourceName),
    #[error("Failed to create the layer: \"{0}\"")]
    LayerCreation(String),
    #[error("No free layer name for \"{source_name}-{shape}\" within {limit} attempts")]
    LayerNamesExhausted {
        source_name: SourceName,
        shape: String,
        limit: usize,
    },
    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),
}

/// Result type for annotation core operations.
pub type Result<T> = std::result::Result<T, Error>;
