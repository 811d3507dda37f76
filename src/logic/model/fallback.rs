//! Fallback Policy
//!
//! Deterministic heuristics used when the classifier or the explainer
//! cannot answer. Pure functions of the raw payload; never fail.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::logic::features::RawFeatures;
use crate::logic::explain::{Attribution, ExplanationResult};
use super::types::{PredictionResult, PredictionSource};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Sole signal used by the heuristics.
pub const BURST_FEATURE: &str = "alert_burst_count";

pub const TRUE_POSITIVE: &str = "TruePositive";
pub const FALSE_POSITIVE: &str = "FalsePositive";
pub const BENIGN_POSITIVE: &str = "BenignPositive";

/// Canonical label set of the fallback distribution.
pub const CANONICAL_LABELS: [&str; 3] = [TRUE_POSITIVE, FALSE_POSITIVE, BENIGN_POSITIVE];

/// Burst count above which an alert is treated as a true positive.
pub const BURST_HIGH: f64 = 10.0;
/// Burst count above which an alert is treated as benign.
pub const BURST_MID: f64 = 5.0;

pub const HIGH_CONFIDENCE: f64 = 0.95;
pub const BENIGN_CONFIDENCE: f64 = 0.75;
pub const NEGATIVE_CONFIDENCE: f64 = 0.85;

pub const FALLBACK_EXPLANATION_LABEL: &str = "TruePositive (Fallback)";
pub const FALLBACK_CONTRIBUTION: f64 = 0.5;
pub const FALLBACK_BASE_VALUE: f64 = 0.5;

// ============================================================================
// PREDICTION FALLBACK
// ============================================================================

/// Burst count from the raw payload; 0 when absent, NaN or not a number.
///
/// Infinite values are kept.
pub fn burst_count(raw: &RawFeatures) -> f64 {
    let burst = match raw.get(BURST_FEATURE) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    burst.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// Burst-count thresholding over the canonical labels.
pub fn fallback_prediction(raw: &RawFeatures, reason: &str) -> PredictionResult {
    let burst = burst_count(raw);

    let (label, confidence) = if burst > BURST_HIGH {
        (TRUE_POSITIVE, HIGH_CONFIDENCE)
    } else if burst > BURST_MID {
        (BENIGN_POSITIVE, BENIGN_CONFIDENCE)
    } else {
        (FALSE_POSITIVE, NEGATIVE_CONFIDENCE)
    };

    // Remaining mass split evenly so the distribution still sums to 1
    let rest = (1.0 - confidence) / (CANONICAL_LABELS.len() - 1) as f64;
    let probabilities: BTreeMap<String, f64> = CANONICAL_LABELS
        .iter()
        .map(|&l| (l.to_string(), if l == label { confidence } else { rest }))
        .collect();

    PredictionResult {
        label: label.to_string(),
        confidence,
        probabilities,
        source: PredictionSource::Fallback,
        fallback_reason: Some(reason.to_string()),
    }
}

// ============================================================================
// EXPLANATION FALLBACK
// ============================================================================

/// Single synthetic attribution on the burst feature.
pub fn fallback_explanation(reason: &str) -> ExplanationResult {
    ExplanationResult {
        prediction: FALLBACK_EXPLANATION_LABEL.to_string(),
        explanation: vec![Attribution {
            feature: BURST_FEATURE.to_string(),
            shap_value: FALLBACK_CONTRIBUTION,
        }],
        base_value: FALLBACK_BASE_VALUE,
        note: Some(format!("Fallback: {}", reason)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawFeatures {
        value.as_object().cloned().unwrap_or_default()
    }

    fn assert_normalized(result: &PredictionResult) {
        let sum: f64 = result.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
        assert_eq!(result.probabilities[&result.label], result.confidence);
        assert_eq!(result.probabilities.len(), 3);
    }

    #[test]
    fn test_high_burst_is_true_positive() {
        let result = fallback_prediction(&raw(json!({"alert_burst_count": 50})), "Model not loaded");
        assert_eq!(result.label, TRUE_POSITIVE);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.source, PredictionSource::Fallback);
        assert_eq!(result.fallback_reason.as_deref(), Some("Model not loaded"));
        assert_normalized(&result);
    }

    #[test]
    fn test_mid_burst_is_benign() {
        let result = fallback_prediction(&raw(json!({"alert_burst_count": 7})), "x");
        assert_eq!(result.label, BENIGN_POSITIVE);
        assert_eq!(result.confidence, 0.75);
        assert_normalized(&result);
    }

    #[test]
    fn test_low_burst_is_false_positive() {
        let result = fallback_prediction(&raw(json!({"alert_burst_count": 2})), "x");
        assert_eq!(result.label, FALSE_POSITIVE);
        assert_eq!(result.confidence, 0.85);
        assert_normalized(&result);
    }

    #[test]
    fn test_empty_input_defaults_to_zero_burst() {
        let result = fallback_prediction(&RawFeatures::new(), "x");
        assert_eq!(result.label, FALSE_POSITIVE);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(fallback_prediction(&raw(json!({"alert_burst_count": 10})), "x").label, BENIGN_POSITIVE);
        assert_eq!(fallback_prediction(&raw(json!({"alert_burst_count": 5})), "x").label, FALSE_POSITIVE);
    }

    #[test]
    fn test_burst_coercion() {
        assert_eq!(burst_count(&raw(json!({"alert_burst_count": "12"}))), 12.0);
        assert_eq!(burst_count(&raw(json!({"alert_burst_count": "many"}))), 0.0);
        assert_eq!(burst_count(&raw(json!({"alert_burst_count": {"n": 3}}))), 0.0);
        assert_eq!(burst_count(&raw(json!({"alert_burst_count": null}))), 0.0);
        assert_eq!(burst_count(&raw(json!({"alert_burst_count": "nan"}))), 0.0);
    }

    #[test]
    fn test_infinite_burst_is_true_positive() {
        for burst in ["inf", "1e400", " Infinity "] {
            let result = fallback_prediction(&raw(json!({"alert_burst_count": burst})), "x");
            assert_eq!(result.label, TRUE_POSITIVE, "burst = {}", burst);
        }
        let result = fallback_prediction(&raw(json!({"alert_burst_count": "-inf"})), "x");
        assert_eq!(result.label, FALSE_POSITIVE);
    }

    #[test]
    fn test_fallback_explanation_shape() {
        let result = fallback_explanation("Explainer failed");
        assert_eq!(result.prediction, "TruePositive (Fallback)");
        assert_eq!(result.explanation.len(), 1);
        assert_eq!(result.explanation[0].feature, BURST_FEATURE);
        assert_eq!(result.explanation[0].shap_value, 0.5);
        assert_eq!(result.base_value, 0.5);
        assert_eq!(result.note.as_deref(), Some("Fallback: Explainer failed"));
    }
}
