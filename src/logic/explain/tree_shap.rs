//! Tree Explainer - exact path-dependent TreeSHAP
//!
//! Per-feature attributions for every output group of a tree ensemble.
//! Node cover (sum of hessians) stands in for the background data, so
//! the attributions plus the group's base value reproduce its raw margin.
//!
//! Recursion tracks the set of features on the current root-to-node path
//! together with the fraction of "zero" (feature unknown) and "one"
//! (feature known, follows `x`) paths flowing through each. Leaves credit
//! every path feature with its Shapley-weighted share of the leaf value.

use std::sync::Arc;

use crate::logic::model::{Booster, Node, Tree};
use super::error::ExplainError;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` only for the root placeholder.
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Attribution method bound to one loaded booster.
pub struct TreeExplainer {
    booster: Arc<Booster>,
    /// Expected (cover-weighted) value per group.
    base_values: Vec<f64>,
}

impl TreeExplainer {
    /// Validate covers and precompute the per-group base values.
    pub fn new(booster: Arc<Booster>) -> Result<Self, ExplainError> {
        let mut base_values: Vec<f64> = (0..booster.num_groups())
            .map(|g| booster.base_margin(g))
            .collect();

        for (index, tree) in booster.trees().iter().enumerate() {
            check_covers(tree).map_err(|msg| ExplainError::Init(format!("tree {}: {}", index, msg)))?;
            base_values[tree.group()] += expected_value(tree, 0);
        }

        if base_values.iter().any(|v| !v.is_finite()) {
            return Err(ExplainError::Init("non-finite base value".to_string()));
        }

        Ok(Self { booster, base_values })
    }

    pub fn booster(&self) -> &Arc<Booster> {
        &self.booster
    }

    pub fn base_value(&self, group: usize) -> f64 {
        self.base_values.get(group).copied().unwrap_or(0.0)
    }

    /// Attribution vector (one entry per model feature) for every group.
    pub fn shap_values(&self, x: &[f64]) -> Result<Vec<Vec<f64>>, ExplainError> {
        let width = self.booster.num_feature();
        if x.len() != width {
            return Err(ExplainError::ShapeMismatch {
                expected: width,
                got: x.len(),
            });
        }

        let mut phi = vec![vec![0.0; width]; self.booster.num_groups()];
        for tree in self.booster.trees() {
            recurse(tree, x, &mut phi[tree.group()], 0, &[], 1.0, 1.0, None);
        }

        if phi.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ExplainError::NonFinite);
        }
        Ok(phi)
    }
}

// ============================================================================
// TREE STATISTICS
// ============================================================================

fn check_covers(tree: &Tree) -> Result<(), String> {
    for (id, node) in tree.nodes().iter().enumerate() {
        let cover = node.cover();
        match node {
            Node::Branch { .. } if !(cover.is_finite() && cover > 0.0) => {
                return Err(format!("split node {} has cover {}", id, cover));
            }
            Node::Leaf { .. } if !cover.is_finite() => {
                return Err(format!("leaf {} has cover {}", id, cover));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Cover-weighted mean leaf value below `id`.
fn expected_value(tree: &Tree, id: usize) -> f64 {
    match tree.node(id) {
        Node::Leaf { value, .. } => *value,
        Node::Branch { left, right, cover, .. } => {
            let l = tree.node(*left).cover();
            let r = tree.node(*right).cover();
            (l * expected_value(tree, *left) + r * expected_value(tree, *right)) / cover
        }
    }
}

// ============================================================================
// PATH ALGEBRA
// ============================================================================

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension of `path[index]`.
fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one * denom / ((i + 1) as f64 * one);
            next_one = tmp - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with `path[index]` unwound.
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((depth - i) as f64 / denom);
        }
    }
    total
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    phi: &mut [f64],
    id: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend(&mut path, zero_fraction, one_fraction, feature);

    let node = tree.node(id);
    match node {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let el = path[i];
                if let Some(f) = el.feature {
                    let w = unwound_sum(&path, i);
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        Node::Branch { feature: split_feature, left, right, cover, .. } => {
            let hot = node.next(x).unwrap_or(*left);
            let cold = if hot == *left { *right } else { *left };
            let hot_zero = tree.node(hot).cover() / cover;
            let cold_zero = tree.node(cold).cover() / cover;

            // A feature split on twice contributes once: fold the earlier split in
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*split_feature)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind(&mut path, k);
            }

            let split = Some(*split_feature);
            recurse(tree, x, phi, hot, &path, hot_zero * incoming_zero, incoming_one, split);
            recurse(tree, x, phi, cold, &path, cold_zero * incoming_zero, 0.0, split);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{align, FeatureSchema, RawFeatures};
    use crate::logic::testutil::{MODEL_JSON, SCHEMA_JSON};
    use serde_json::json;

    const EPS: f64 = 1e-9;

    fn explainer(json: &str) -> TreeExplainer {
        TreeExplainer::new(Arc::new(Booster::from_json(json).unwrap())).unwrap()
    }

    fn encode(value: serde_json::Value) -> Vec<f64> {
        let schema = FeatureSchema::from_json(SCHEMA_JSON).unwrap();
        let raw: RawFeatures = value.as_object().cloned().unwrap_or_default();
        align(&raw, &schema).encode(&schema)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn test_single_split_trees() {
        let explainer = explainer(MODEL_JSON);
        let x = encode(json!({"alert_burst_count": 50, "Category": "Execution", "hour_of_day": 3}));
        let phi = explainer.shap_values(&x).unwrap();

        // TruePositive group: burst and category trees
        assert_close(phi[2][0], 1.26);
        assert_close(phi[2][1], 0.64);
        assert_close(phi[2][2], 0.0);
        assert_close(explainer.base_value(2), 0.5);

        // FalsePositive group: one burst tree
        assert_close(phi[0][0], -0.9);
        assert_close(explainer.base_value(0), 0.9);
    }

    #[test]
    fn test_interaction_tree_shapley_split() {
        let explainer = explainer(MODEL_JSON);
        let x = encode(json!({"alert_burst_count": 50, "Category": "Execution", "hour_of_day": 3}));
        let phi = explainer.shap_values(&x).unwrap();

        assert_close(phi[1][2], 0.373333333);
        assert_close(phi[1][0], -0.303333333);
        assert_close(phi[1][1], 0.0);
        assert_close(explainer.base_value(1), 0.53);
    }

    #[test]
    fn test_additivity_against_margins() {
        let explainer = explainer(MODEL_JSON);
        let inputs = [
            json!({"alert_burst_count": 50, "Category": "Execution", "hour_of_day": 3}),
            json!({"alert_burst_count": 2, "hour_of_day": 12}),
            json!({"alert_burst_count": 7, "Category": "Exfiltration", "hour_of_day": 7}),
            json!({}),
        ];

        for input in inputs {
            let x = encode(input);
            let phi = explainer.shap_values(&x).unwrap();
            let margins = explainer.booster().margins(&x);
            for (group, margin) in margins.iter().enumerate() {
                let total: f64 = phi[group].iter().sum::<f64>() + explainer.base_value(group);
                assert!((total - margin).abs() < EPS, "group {}: {} vs {}", group, total, margin);
            }
        }
    }

    #[test]
    fn test_repeated_feature_on_path() {
        let json = r#"{"learner": {
            "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "1"},
            "objective": {"name": "binary:logistic"},
            "gradient_booster": {"name": "gbtree", "model": {"tree_info": [0], "trees": [{
                "left_children": [1, 3, -1, -1, -1], "right_children": [2, 4, -1, -1, -1],
                "split_indices": [0, 0, 0, 0, 0], "split_conditions": [5.0, 2.0, 3.0, 1.0, 2.0],
                "default_left": [1, 1, 0, 0, 0], "sum_hessian": [100.0, 30.0, 70.0, 10.0, 20.0]
            }]}}
        }}"#;
        let explainer = explainer(json);

        let phi = explainer.shap_values(&[3.0]).unwrap();

        // One feature: its attribution is the whole deviation from the mean
        assert_close(explainer.base_value(0), 2.6);
        assert_close(phi[0][0], -0.6);
    }

    #[test]
    fn test_binary_model_single_group() {
        let explainer = explainer(&crate::logic::testutil::binary_model_json());
        let phi = explainer.shap_values(&[20.0]).unwrap();

        assert_eq!(phi.len(), 1);
        assert_close(phi[0][0], 1.5);
        assert_close(explainer.base_value(0), 0.5);
    }

    #[test]
    fn test_zero_cover_fails_init() {
        let json = MODEL_JSON.replacen("\"sum_hessian\": [100.0, 60.0, 40.0]", "\"sum_hessian\": [0.0, 60.0, 40.0]", 1);
        let booster = Arc::new(Booster::from_json(&json).unwrap());

        let err = TreeExplainer::new(booster).err().unwrap();
        assert!(matches!(err, ExplainError::Init(_)));
    }

    #[test]
    fn test_width_mismatch() {
        let explainer = explainer(MODEL_JSON);
        assert_eq!(
            explainer.shap_values(&[1.0]).unwrap_err(),
            ExplainError::ShapeMismatch { expected: 3, got: 1 }
        );
    }
}
