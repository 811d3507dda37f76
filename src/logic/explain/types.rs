use serde::{Deserialize, Serialize};

/// Attributions with magnitude at or below this are dropped as noise.
pub const ATTRIBUTION_THRESHOLD: f64 = 0.001;

/// Maximum number of attributions reported.
pub const TOP_N: usize = 20;

/// One feature's contribution to the predicted class margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub feature: String,
    pub shap_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub prediction: String,
    /// Sorted by descending |shap_value|, at most `TOP_N` entries.
    pub explanation: Vec<Attribution>,
    pub base_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExplanationResult {
    pub fn is_fallback(&self) -> bool {
        self.note.is_some()
    }

    /// Attributions keyed by feature name.
    pub fn as_map(&self) -> std::collections::BTreeMap<String, f64> {
        self.explanation
            .iter()
            .map(|a| (a.feature.clone(), a.shap_value))
            .collect()
    }
}

/// Noise filter, magnitude sort, top-N truncation.
pub fn rank_attributions(names: &[String], values: &[f64]) -> Vec<Attribution> {
    let mut ranked: Vec<Attribution> = names
        .iter()
        .zip(values)
        .filter(|(_, v)| v.abs() > ATTRIBUTION_THRESHOLD)
        .map(|(name, v)| Attribution {
            feature: name.clone(),
            shap_value: *v,
        })
        .collect();

    // Stable: equal magnitudes keep schema order
    ranked.sort_by(|a, b| b.shap_value.abs().total_cmp(&a.shap_value.abs()));
    ranked.truncate(TOP_N);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_filters_sorts_and_truncates() {
        let names: Vec<String> = (0..30).map(|i| format!("f{}", i)).collect();
        let mut values: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { i as f64 } else { -(i as f64) }).collect();
        values[0] = 0.0005;

        let ranked = rank_attributions(&names, &values);

        assert_eq!(ranked.len(), TOP_N);
        assert_eq!(ranked[0].feature, "f29");
        assert_eq!(ranked[0].shap_value, -29.0);
        assert!(ranked.windows(2).all(|w| w[0].shap_value.abs() >= w[1].shap_value.abs()));
        assert!(ranked.iter().all(|a| a.feature != "f0"));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let names = vec!["a".to_string(), "b".to_string()];
        let ranked = rank_attributions(&names, &[0.001, -0.0011]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].feature, "b");
    }

    #[test]
    fn test_ties_keep_schema_order() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_attributions(&names, &[0.5, -0.5, 0.5]);
        let order: Vec<&str> = ranked.iter().map(|a| a.feature.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
