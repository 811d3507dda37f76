//! Booster - Gradient-boosted tree ensemble
//!
//! Native reader for the JSON document written by XGBoost `save_model`.
//! Only the parts needed for inference and attribution are kept:
//! tree topology, split conditions, default directions, node cover,
//! categorical split sets, and the per-tree output group.
//!
//! Traversal matches XGBoost:
//! - missing (NaN)        -> default child
//! - numeric split        -> left when `x < threshold` (compared as f32)
//! - categorical split    -> right when the category is in the node's set

use std::path::Path;

use serde::Deserialize;

use super::error::{InferenceError, ModelError};

/// Largest category code XGBoost can represent exactly in a f32.
const MAX_CATEGORY: f64 = 16_777_216.0;

// ============================================================================
// ON-DISK DOCUMENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDoc,
}

#[derive(Debug, Deserialize)]
struct LearnerDoc {
    learner_model_param: LearnerModelParam,
    gradient_booster: GradientBoosterDoc,
    objective: ObjectiveDoc,
}

/// XGBoost stores these as strings ("5E-1", "3").
#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct GradientBoosterDoc {
    name: String,
    #[serde(default)]
    model: Option<GbTreeDoc>,
}

#[derive(Debug, Deserialize)]
struct GbTreeDoc {
    trees: Vec<TreeDoc>,
    tree_info: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDoc {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeDoc {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    sum_hessian: Vec<f64>,
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    categories: Vec<i64>,
    #[serde(default)]
    categories_nodes: Vec<i64>,
    #[serde(default)]
    categories_segments: Vec<u64>,
    #[serde(default)]
    categories_sizes: Vec<u64>,
}

/// `default_left` is 0/1 in older documents, bool in newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    Numeric { threshold: f32 },
    /// Sorted category codes that route right.
    Categorical { categories: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
        cover: f64,
    },
    Branch {
        feature: usize,
        split: Split,
        left: usize,
        right: usize,
        default_left: bool,
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Leaf { cover, .. } | Node::Branch { cover, .. } => *cover,
        }
    }

    /// Child taken by `x`; `None` for leaves.
    pub fn next(&self, x: &[f64]) -> Option<usize> {
        let Node::Branch { feature, split, left, right, default_left, .. } = self else {
            return None;
        };

        let value = x.get(*feature).copied().unwrap_or(f64::NAN);
        if value.is_nan() {
            return Some(if *default_left { *left } else { *right });
        }

        let go_left = match split {
            Split::Numeric { threshold } => (value as f32) < *threshold,
            Split::Categorical { categories } => {
                if value < 0.0 || value >= MAX_CATEGORY {
                    true
                } else {
                    categories.binary_search(&(value as u32)).is_err()
                }
            }
        };

        Some(if go_left { *left } else { *right })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    group: usize,
}

impl Tree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Output group (class) this tree contributes to.
    pub fn group(&self) -> usize {
        self.group
    }

    pub fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value, .. } => return *value,
                node => match node.next(x) {
                    Some(child) => id = child,
                    None => return 0.0,
                },
            }
        }
    }

    fn from_doc(doc: TreeDoc, group: usize, num_feature: usize, index: usize) -> Result<Self, ModelError> {
        let n = doc.left_children.len();
        let invalid = |msg: String| ModelError::Invalid(format!("tree {}: {}", index, msg));

        if n == 0 {
            return Err(invalid("no nodes".to_string()));
        }
        let lengths = [
            doc.right_children.len(),
            doc.split_indices.len(),
            doc.split_conditions.len(),
            doc.default_left.len(),
            doc.sum_hessian.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(invalid("node arrays differ in length".to_string()));
        }
        if !doc.split_type.is_empty() && doc.split_type.len() != n {
            return Err(invalid("split_type length differs from node count".to_string()));
        }

        let categorical_sets = categorical_sets(&doc, n).map_err(invalid)?;

        let mut nodes = Vec::with_capacity(n);
        for id in 0..n {
            let cover = doc.sum_hessian[id];
            let left = doc.left_children[id];
            let right = doc.right_children[id];

            if left < 0 {
                nodes.push(Node::Leaf { value: doc.split_conditions[id], cover });
                continue;
            }

            let left = usize::try_from(left).map_err(|_| invalid(format!("node {} bad left child", id)))?;
            let right = usize::try_from(right).map_err(|_| invalid(format!("node {} bad right child", id)))?;
            if left >= n || right >= n {
                return Err(invalid(format!("node {} child out of range", id)));
            }

            let feature = usize::try_from(doc.split_indices[id])
                .ok()
                .filter(|&f| f < num_feature)
                .ok_or_else(|| invalid(format!("node {} splits on unknown feature", id)))?;

            let is_categorical = doc.split_type.get(id).copied().unwrap_or(0) == 1;
            let split = if is_categorical {
                let categories = categorical_sets[id]
                    .clone()
                    .ok_or_else(|| invalid(format!("node {} has no category set", id)))?;
                Split::Categorical { categories }
            } else {
                Split::Numeric { threshold: doc.split_conditions[id] as f32 }
            };

            nodes.push(Node::Branch {
                feature,
                split,
                left,
                right,
                default_left: doc.default_left[id].is_set(),
                cover,
            });
        }

        check_topology(&nodes).map_err(invalid)?;
        Ok(Self { nodes, group })
    }
}

fn categorical_sets(doc: &TreeDoc, n: usize) -> Result<Vec<Option<Vec<u32>>>, String> {
    let mut sets = vec![None; n];
    let count = doc.categories_nodes.len();
    if doc.categories_segments.len() != count || doc.categories_sizes.len() != count {
        return Err("categorical arrays differ in length".to_string());
    }

    for i in 0..count {
        let node = usize::try_from(doc.categories_nodes[i])
            .ok()
            .filter(|&id| id < n)
            .ok_or_else(|| format!("categorical entry {} names unknown node", i))?;
        let start = usize::try_from(doc.categories_segments[i]).ok();
        let size = usize::try_from(doc.categories_sizes[i]).ok();
        let slice = start
            .zip(size)
            .and_then(|(start, size)| Some(start..start.checked_add(size)?))
            .and_then(|range| doc.categories.get(range))
            .ok_or_else(|| format!("categorical entry {} out of range", i))?;

        let mut set = slice
            .iter()
            .map(|&c| u32::try_from(c).map_err(|_| format!("negative category in node {}", node)))
            .collect::<Result<Vec<u32>, String>>()?;
        set.sort_unstable();
        set.dedup();
        sets[node] = Some(set);
    }

    Ok(sets)
}

/// Deepest root-to-leaf path accepted at load; explanation walks trees recursively.
pub const MAX_TREE_DEPTH: usize = 512;

/// Every node reachable from the root exactly once, within `MAX_TREE_DEPTH`.
fn check_topology(nodes: &[Node]) -> Result<(), String> {
    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![(0usize, 1usize)];

    while let Some((id, depth)) = stack.pop() {
        if visited[id] {
            return Err(format!("node {} reachable twice", id));
        }
        if depth > MAX_TREE_DEPTH {
            return Err(format!("deeper than {} levels", MAX_TREE_DEPTH));
        }
        visited[id] = true;
        if let Node::Branch { left, right, .. } = &nodes[id] {
            stack.push((*left, depth + 1));
            stack.push((*right, depth + 1));
        }
    }

    Ok(())
}

// ============================================================================
// BOOSTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// multi:softprob / multi:softmax
    Softmax,
    /// binary:logistic
    Logistic,
}

/// One model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    /// Raw margin per output group.
    pub margins: Vec<f64>,
    /// Distribution over classes.
    pub probabilities: Vec<f64>,
    pub class_index: usize,
}

#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    num_feature: usize,
    num_class: usize,
    objective: Objective,
    /// Margin-space starting value per output group.
    base_margin: Vec<f64>,
}

impl Booster {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let doc: ModelDocument = serde_json::from_str(json)?;
        Self::from_document(doc.learner)
    }

    fn from_document(learner: LearnerDoc) -> Result<Self, ModelError> {
        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::Unsupported(format!(
                "booster '{}'",
                learner.gradient_booster.name
            )));
        }

        let params = &learner.learner_model_param;
        let num_feature: usize = params
            .num_feature
            .trim()
            .parse()
            .map_err(|_| ModelError::Invalid(format!("num_feature '{}'", params.num_feature)))?;
        let declared_classes: usize = match &params.num_class {
            Some(s) => s
                .trim()
                .parse()
                .map_err(|_| ModelError::Invalid(format!("num_class '{}'", s)))?,
            None => 0,
        };

        let (objective, num_class, num_groups) = match learner.objective.name.as_str() {
            "multi:softprob" | "multi:softmax" => {
                if declared_classes < 2 {
                    return Err(ModelError::Invalid(format!("num_class {} for multiclass objective", declared_classes)));
                }
                (Objective::Softmax, declared_classes, declared_classes)
            }
            "binary:logistic" => (Objective::Logistic, 2, 1),
            other => return Err(ModelError::Unsupported(format!("objective '{}'", other))),
        };

        let base_scores = parse_base_score(&params.base_score)?;
        let base_margin = base_margins(objective, &base_scores, num_groups)?;

        let gbtree = learner
            .gradient_booster
            .model
            .ok_or_else(|| ModelError::Invalid("missing tree model".to_string()))?;
        if gbtree.tree_info.len() != gbtree.trees.len() {
            return Err(ModelError::Invalid("tree_info length differs from tree count".to_string()));
        }

        let trees = gbtree
            .trees
            .into_iter()
            .zip(gbtree.tree_info)
            .enumerate()
            .map(|(index, (doc, group))| {
                if group >= num_groups {
                    return Err(ModelError::Invalid(format!("tree {} assigned to group {}", index, group)));
                }
                Tree::from_doc(doc, group, num_feature, index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            num_feature,
            num_class,
            objective,
            base_margin,
        })
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    /// Size of the output distribution.
    pub fn num_classes(&self) -> usize {
        self.num_class
    }

    /// Number of margin outputs (1 for binary models).
    pub fn num_groups(&self) -> usize {
        self.base_margin.len()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn base_margin(&self, group: usize) -> f64 {
        self.base_margin.get(group).copied().unwrap_or(0.0)
    }

    /// Output group whose margin drives the given class.
    pub fn group_for_class(&self, class_index: usize) -> usize {
        match self.objective {
            Objective::Softmax => class_index,
            Objective::Logistic => 0,
        }
    }

    pub fn check_width(&self, x: &[f64]) -> Result<(), InferenceError> {
        if x.len() != self.num_feature {
            return Err(InferenceError::ShapeMismatch {
                expected: self.num_feature,
                got: x.len(),
            });
        }
        Ok(())
    }

    pub fn margins(&self, x: &[f64]) -> Vec<f64> {
        let mut margins = self.base_margin.clone();
        for tree in &self.trees {
            margins[tree.group()] += tree.leaf_value(x);
        }
        margins
    }

    pub fn predict(&self, x: &[f64]) -> Result<RawPrediction, InferenceError> {
        self.check_width(x)?;

        let margins = self.margins(x);
        let probabilities = match self.objective {
            Objective::Softmax => softmax(&margins),
            Objective::Logistic => {
                let p = sigmoid(margins[0]);
                vec![1.0 - p, p]
            }
        };

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite);
        }

        let class_index = argmax(&probabilities);
        Ok(RawPrediction {
            margins,
            probabilities,
            class_index,
        })
    }
}

/// "5E-1" or "[3.3E-1,3.3E-1,3.3E-1]"
fn parse_base_score(raw: &str) -> Result<Vec<f64>, ModelError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ModelError::Invalid(format!("base_score '{}'", raw)))
        })
        .collect()
}

fn base_margins(objective: Objective, scores: &[f64], groups: usize) -> Result<Vec<f64>, ModelError> {
    let per_group: Vec<f64> = match scores.len() {
        1 => vec![scores[0]; groups],
        n if n == groups => scores.to_vec(),
        n => {
            return Err(ModelError::Invalid(format!(
                "{} base scores for {} output groups",
                n, groups
            )))
        }
    };

    match objective {
        Objective::Softmax => Ok(per_group),
        Objective::Logistic => per_group
            .into_iter()
            .map(|p| {
                if p <= 0.0 || p >= 1.0 {
                    Err(ModelError::Invalid(format!("logistic base_score {} outside (0, 1)", p)))
                } else {
                    Ok((p / (1.0 - p)).ln())
                }
            })
            .collect(),
    }
}

pub fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Index of the largest value; first wins on ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

// ============================================================================
// TESTS
// ============================================================================
