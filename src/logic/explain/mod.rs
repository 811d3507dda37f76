//! Explain Module - Feature Attribution
//!
//! Exact TreeSHAP over the loaded booster, ranked and truncated for
//! presentation.

pub mod error;
pub mod types;
pub mod tree_shap;
pub mod engine;

// Re-export common types
pub use error::ExplainError;
pub use types::{Attribution, ExplanationResult, ATTRIBUTION_THRESHOLD, TOP_N};
pub use tree_shap::TreeExplainer;
pub use engine::ExplanationEngine;
