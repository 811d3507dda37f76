//! Artifact Locator
//!
//! Resolves which model + feature-list pair to load. Candidates are probed
//! in order (explicit override, packaged production dir, development tree);
//! the first candidate with an existing artifact wins.

use std::path::{Path, PathBuf};

use serde::Serialize;

pub const MODEL_FILE: &str = "xgboost_model.json";
pub const FEATURE_LIST_FILE: &str = "feature_list.json";

/// One model/schema pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub feature_list: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, feature_list: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            feature_list: feature_list.into(),
        }
    }

    /// Production layout: both files side by side.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(MODEL_FILE), dir.join(FEATURE_LIST_FILE))
    }

    /// Development layout: `<root>/artifacts/<model>` + `<root>/ml/<feature list>`.
    pub fn dev_tree(root: &Path) -> Self {
        Self::new(
            root.join("artifacts").join(MODEL_FILE),
            root.join("ml").join(FEATURE_LIST_FILE),
        )
    }

    fn any_exists(&self) -> bool {
        self.model.exists() || self.feature_list.exists()
    }
}

/// Ordered list of candidate locations.
#[derive(Debug, Clone, Default)]
pub struct ArtifactLocator {
    candidates: Vec<ArtifactPaths>,
}

impl ArtifactLocator {
    pub fn new(candidates: Vec<ArtifactPaths>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[ArtifactPaths] {
        &self.candidates
    }

    /// First candidate with an existing artifact, else the first candidate
    /// (so load errors name the primary location).
    pub fn resolve(&self) -> Option<ArtifactPaths> {
        let found = self.candidates.iter().find(|c| c.any_exists());
        match found {
            Some(paths) => {
                tracing::debug!(model = %paths.model.display(), "Artifact location resolved");
                Some(paths.clone())
            }
            None => {
                tracing::warn!(candidates = self.candidates.len(), "No model artifacts found in any candidate location");
                self.candidates.first().cloned()
            }
        }
    }
}
