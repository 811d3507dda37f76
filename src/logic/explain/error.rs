//! Explanation error kinds

use crate::logic::model::InferenceError;

/// Attribution failures. Independent of plain inference failures: the
/// explainer can fail to initialise while the classifier still answers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    #[error("Explainer init failed: {0}")]
    Init(String),

    #[error("attribution input mismatch: expected {expected} columns, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("attribution produced non-finite values")]
    NonFinite,

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
