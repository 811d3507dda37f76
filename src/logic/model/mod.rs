//! Model Module - Gradient-Boosted Tree Classifier
//!
//! Native XGBoost JSON loading, lazy classifier engine, and the
//! heuristics used when the model cannot answer.

pub mod error;
pub mod booster;
pub mod types;
pub mod engine;
pub mod fallback;

// Re-export common types
pub use error::{InferenceError, ModelError};
pub use booster::{Booster, Node, Objective, Split, Tree};
pub use types::{LoadState, PredictionResult, PredictionSource};
pub use engine::{classify_with, Classification, ClassifierEngine, ClassifierStats};
pub use fallback::{fallback_explanation, fallback_prediction};
