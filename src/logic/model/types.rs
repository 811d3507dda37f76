use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Fallback,
}

/// Classification outcome. Same shape on the model and fallback paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    /// Probability mass assigned to `label`.
    pub confidence: f64,
    /// Every known label -> probability; sums to 1.
    pub probabilities: BTreeMap<String, f64>,
    pub source: PredictionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl PredictionResult {
    pub fn is_fallback(&self) -> bool {
        self.source == PredictionSource::Fallback
    }
}

/// Lifecycle of a lazily loaded component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed(String),
}
