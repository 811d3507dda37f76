//! Feature Schema - Training-time column layout
//!
//! Ordered feature names + label mapping exported by the training job
//! (`feature_list.json`). The order of `feature_names` is the column order
//! the model was trained on and is NEVER changed after load.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("feature list not found at {0}")]
    NotFound(String),

    #[error("failed to read feature list: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed feature list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid label mapping: {0}")]
    InvalidLabels(String),
}

// ============================================================================
// DESCRIPTOR (on-disk shape)
// ============================================================================

/// `{"features": [...], "labels": {"TruePositive": 2, ...}, "categories": {...}}`
#[derive(Debug, Deserialize)]
struct SchemaDescriptor {
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    labels: HashMap<String, usize>,
    #[serde(default)]
    categories: HashMap<String, Vec<String>>,
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Immutable training-time schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSchema {
    feature_names: Vec<String>,
    /// class index -> label (inverted from the descriptor)
    label_mapping: BTreeMap<usize, String>,
    /// categorical feature -> token -> training code
    categories: HashMap<String, HashMap<String, u32>>,
}

impl FeatureSchema {
    /// Degraded registry: no features, no labels.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from parts. Labels must cover `0..K-1` exactly once.
    pub fn new(
        feature_names: Vec<String>,
        labels: HashMap<String, usize>,
        categories: HashMap<String, Vec<String>>,
    ) -> Result<Self, SchemaError> {
        let label_mapping = invert_labels(labels)?;

        let categories = categories
            .into_iter()
            .map(|(feature, tokens)| {
                let codes = tokens
                    .into_iter()
                    .enumerate()
                    .map(|(code, token)| (token, code as u32))
                    .collect();
                (feature, codes)
            })
            .collect();

        Ok(Self {
            feature_names,
            label_mapping,
            categories,
        })
    }

    /// Parse a descriptor document.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let descriptor: SchemaDescriptor = serde_json::from_str(json)?;
        Self::new(descriptor.features, descriptor.labels, descriptor.categories)
    }

    /// Load from disk.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if !path.exists() {
            return Err(SchemaError::NotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from disk, degrading to the empty schema on any error.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(schema) => {
                tracing::info!(
                    path = %path.display(),
                    features = schema.feature_count(),
                    classes = schema.num_classes(),
                    "Feature schema loaded"
                );
                schema
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Feature schema unavailable, running degraded");
                Self::empty()
            }
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn num_classes(&self) -> usize {
        self.label_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty() && self.label_mapping.is_empty()
    }

    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.label_mapping.get(&index).map(String::as_str)
    }

    /// Labels in class-index order.
    pub fn labels(&self) -> Vec<String> {
        self.label_mapping.values().cloned().collect()
    }

    /// Training code for a categorical token, if the feature declares categories.
    pub fn category_code(&self, feature: &str, token: &str) -> Option<u32> {
        self.categories.get(feature)?.get(token).copied()
    }
}

fn invert_labels(labels: HashMap<String, usize>) -> Result<BTreeMap<usize, String>, SchemaError> {
    let count = labels.len();
    let mut mapping = BTreeMap::new();

    for (label, index) in labels {
        if index >= count {
            return Err(SchemaError::InvalidLabels(format!(
                "index {} for '{}' outside 0..{}",
                index, label, count
            )));
        }
        if let Some(existing) = mapping.insert(index, label.clone()) {
            return Err(SchemaError::InvalidLabels(format!(
                "index {} assigned to both '{}' and '{}'",
                index, existing, label
            )));
        }
    }

    Ok(mapping)
}

/// Serializable snapshot for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub feature_count: usize,
    pub labels: Vec<String>,
    pub categorical_features: Vec<String>,
}

impl From<&FeatureSchema> for SchemaInfo {
    fn from(schema: &FeatureSchema) -> Self {
        let mut categorical_features: Vec<String> = schema.categories.keys().cloned().collect();
        categorical_features.sort();
        Self {
            feature_count: schema.feature_count(),
            labels: schema.labels(),
            categorical_features,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
