//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::logic::advice::AdviceConfig;
use crate::logic::alerts::DEFAULT_CAPACITY;
use crate::logic::features::artifacts::{FEATURE_LIST_FILE, MODEL_FILE};
use crate::logic::features::{ArtifactLocator, ArtifactPaths};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Packaged artifact directory
    pub models_dir: PathBuf,

    /// Development tree root (`artifacts/`, `ml/`)
    pub project_root: PathBuf,

    /// Explicit artifact overrides, probed first
    pub model_path: Option<PathBuf>,
    pub feature_list_path: Option<PathBuf>,

    /// Knowledge-base service; unset means playbook only
    pub rag_service_url: Option<String>,
    pub rag_timeout_secs: u64,

    pub alert_store_capacity: usize,

    /// Load model + explainer at startup instead of on first request
    pub eager_model_load: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),

            models_dir: lookup("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),

            project_root: lookup("PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),

            model_path: non_empty("MODEL_PATH").map(PathBuf::from),
            feature_list_path: non_empty("FEATURE_LIST_PATH").map(PathBuf::from),

            rag_service_url: non_empty("RAG_SERVICE_URL"),

            rag_timeout_secs: lookup("RAG_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(10),

            alert_store_capacity: lookup("ALERT_STORE_CAPACITY")
                .and_then(|c| c.parse().ok())
                .filter(|&c| c > 0)
                .unwrap_or(DEFAULT_CAPACITY),

            eager_model_load: lookup("EAGER_MODEL_LOAD")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Artifact probe order: override, production dir, development tree.
    pub fn artifact_locator(&self) -> ArtifactLocator {
        let mut candidates = Vec::with_capacity(3);

        if self.model_path.is_some() || self.feature_list_path.is_some() {
            candidates.push(ArtifactPaths::new(
                self.model_path.clone().unwrap_or_else(|| self.models_dir.join(MODEL_FILE)),
                self.feature_list_path
                    .clone()
                    .unwrap_or_else(|| self.models_dir.join(FEATURE_LIST_FILE)),
            ));
        }
        candidates.push(ArtifactPaths::in_dir(&self.models_dir));
        candidates.push(ArtifactPaths::dev_tree(&self.project_root));

        ArtifactLocator::new(candidates)
    }

    pub fn advice_config(&self) -> AdviceConfig {
        AdviceConfig {
            base_url: self.rag_service_url.clone(),
            timeout_seconds: self.rag_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.rag_service_url, None);
        assert_eq!(config.rag_timeout_secs, 10);
        assert_eq!(config.alert_store_capacity, 500);
        assert!(config.eager_model_load);

        let candidates = config.artifact_locator().candidates().to_vec();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].model, PathBuf::from("models").join(MODEL_FILE));
        assert_eq!(candidates[1].feature_list, PathBuf::from(".").join("ml").join(FEATURE_LIST_FILE));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9100"),
            ("ENVIRONMENT", "production"),
            ("MODEL_PATH", "/srv/model.json"),
            ("RAG_SERVICE_URL", "http://kb:8001"),
            ("EAGER_MODEL_LOAD", "false"),
            ("ALERT_STORE_CAPACITY", "0"),
        ]);

        assert_eq!(config.port, 9100);
        assert!(config.is_production());
        assert!(!config.eager_model_load);
        assert_eq!(config.alert_store_capacity, 500);
        assert_eq!(config.advice_config().base_url.as_deref(), Some("http://kb:8001"));

        let candidates = config.artifact_locator().candidates().to_vec();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].model, PathBuf::from("/srv/model.json"));
        assert_eq!(candidates[0].feature_list, PathBuf::from("models").join(FEATURE_LIST_FILE));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = config(&[("RAG_SERVICE_URL", "  "), ("PORT", "not-a-port")]);
        assert_eq!(config.rag_service_url, None);
        assert_eq!(config.port, 8000);
    }
}
