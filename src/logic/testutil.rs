//! Shared test fixtures: a small hand-built 3-class XGBoost document
//! and its feature list.
//!
//! Features: 0 = alert_burst_count, 1 = Category, 2 = hour_of_day.
//! Groups:   0 = FalsePositive, 1 = BenignPositive, 2 = TruePositive.
//!
//! - tree 0 (FP): burst < 5  -> +1.0 (cover 60) | -0.5 (cover 40)
//! - tree 1 (BP): hour < 8   -> [burst < 10 -> 0.8 (20) | 0.1 (10)] | -0.2 (70)
//! - tree 2 (TP): burst < 10 -> -0.6 (cover 70) | 1.2 (cover 30)
//! - tree 3 (TP): Category in {Execution} -> 0.7 (cover 20), else -0.1 (cover 80)

use std::path::Path;

use crate::logic::features::ArtifactPaths;

pub const MODEL_JSON: &str = r#"{
  "learner": {
    "attributes": {},
    "feature_names": [],
    "feature_types": [],
    "learner_model_param": {
      "base_score": "5E-1",
      "boost_from_average": "1",
      "num_class": "3",
      "num_feature": "3",
      "num_target": "1"
    },
    "objective": {"name": "multi:softprob", "softmax_multiclass_param": {"num_class": "3"}},
    "gradient_booster": {
      "name": "gbtree",
      "model": {
        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "4"},
        "tree_info": [0, 1, 2, 2],
        "trees": [
          {
            "id": 0,
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0],
            "split_conditions": [5.0, 1.0, -0.5],
            "default_left": [1, 0, 0],
            "sum_hessian": [100.0, 60.0, 40.0],
            "split_type": [0, 0, 0],
            "categories": [], "categories_nodes": [], "categories_segments": [], "categories_sizes": []
          },
          {
            "id": 1,
            "left_children": [1, 3, -1, -1, -1],
            "right_children": [2, 4, -1, -1, -1],
            "split_indices": [2, 0, 0, 0, 0],
            "split_conditions": [8.0, 10.0, -0.2, 0.8, 0.1],
            "default_left": [false, true, false, false, false],
            "sum_hessian": [100.0, 30.0, 70.0, 20.0, 10.0]
          },
          {
            "id": 2,
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0],
            "split_conditions": [10.0, -0.6, 1.2],
            "default_left": [1, 0, 0],
            "sum_hessian": [100.0, 70.0, 30.0]
          },
          {
            "id": 3,
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [1, 0, 0],
            "split_conditions": [0.0, -0.1, 0.7],
            "default_left": [1, 0, 0],
            "sum_hessian": [100.0, 80.0, 20.0],
            "split_type": [1, 0, 0],
            "categories": [0],
            "categories_nodes": [0],
            "categories_segments": [0],
            "categories_sizes": [1]
          }
        ]
      }
    }
  },
  "version": [2, 0, 3]
}"#;

pub const SCHEMA_JSON: &str = r#"{
  "features": ["alert_burst_count", "Category", "hour_of_day"],
  "labels": {"FalsePositive": 0, "BenignPositive": 1, "TruePositive": 2},
  "categories": {"Category": ["Execution", "InitialAccess", "Exfiltration"]}
}"#;

/// Single-feature binary model: burst < 10 -> -1.0 | 2.0, base 0.5.
pub fn binary_model_json() -> String {
    r#"{"learner": {
        "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "1"},
        "objective": {"name": "binary:logistic"},
        "gradient_booster": {"name": "gbtree", "model": {"tree_info": [0], "trees": [{
            "left_children": [1, -1, -1], "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0], "split_conditions": [10.0, -1.0, 2.0],
            "default_left": [1, 0, 0], "sum_hessian": [50.0, 25.0, 25.0]
        }]}}
    }}"#
    .to_string()
}

/// Write the fixture pair into `dir` (production layout).
pub fn write_artifacts(dir: &Path) -> ArtifactPaths {
    let paths = ArtifactPaths::in_dir(dir);
    std::fs::write(&paths.model, MODEL_JSON).unwrap();
    std::fs::write(&paths.feature_list, SCHEMA_JSON).unwrap();
    paths
}
