//! Error types for the voc-eval library.

use thiserror::Error;

/// Result type for voc-eval operations.
pub type Result<T> = std::result::Result<T, VocEvalError>;

/// Error types that can occur while decoding, filtering or evaluating detections.
#[derive(Error, Debug)]
pub enum VocEvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Negative or inverted box coordinates.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A score vector or a parallel collection has the wrong length.
    #[error("Mismatched size: {0}")]
    MismatchedSize(String),

    /// Shape encoding was requested but no shape descriptor calculator was supplied.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    /// Lookup of a category id or name that is not in the catalog.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// A detection refers to an image that has no ground truth entry.
    #[error("Unknown image: {0}")]
    UnknownImage(String),

    /// Invalid score or overlap threshold.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Detection settings that cannot describe a grid layout.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Failure while resizing a shape mask.
    #[error("Mask resize failed: {0}")]
    MaskResize(String),
}
