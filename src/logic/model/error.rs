//! Model error kinds
//!
//! Tagged failures returned by the classifier stages. The pipeline
//! branches on these to pick a fallback; none of them reach callers.

/// Artifact load failures (configuration errors).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model not found at {0}")]
    NotFound(String),

    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed model document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported model: {0}")]
    Unsupported(String),

    #[error("invalid model structure: {0}")]
    Invalid(String),
}

/// Per-request inference failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not loaded")]
    NotLoaded,

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("feature shape mismatch: expected {expected} columns, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("label mapping has {labels} labels but model outputs {classes} classes")]
    LabelMismatch { labels: usize, classes: usize },

    #[error("model produced non-finite output")]
    NonFinite,
}
