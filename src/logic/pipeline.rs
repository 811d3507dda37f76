//! Inference Pipeline
//!
//! Composition root for the triage model: schema registry, aligner,
//! classifier, explainer and the fallback policy. Every public operation
//! returns a well-formed result; stage failures come back as tagged errors
//! and are routed to the matching fallback here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::logic::explain::{ExplanationEngine, ExplanationResult};
use crate::logic::features::{align, AlignedRow, ArtifactLocator, ArtifactPaths, FeatureSchema, RawFeatures, SchemaInfo};
use crate::logic::model::{
    fallback_explanation, fallback_prediction, ClassifierEngine, LoadState, PredictionResult,
};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Classification and its explanation for the same aligned row.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub prediction: PredictionResult,
    pub explanation: ExplanationResult,
}

/// Operator-facing snapshot of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub schema: SchemaInfo,
    pub model: LoadState,
    pub explainer: LoadState,
    pub artifacts: Option<ArtifactPaths>,
    pub inference_count: u64,
    pub avg_latency_ms: f64,
    pub fallback_count: u64,
}

pub struct InferencePipeline {
    locator: ArtifactLocator,
    artifacts: RwLock<Option<ArtifactPaths>>,
    schema: RwLock<Arc<FeatureSchema>>,
    classifier: ClassifierEngine,
    explainer: ExplanationEngine,
    fallback_count: AtomicU64,
}

impl InferencePipeline {
    /// Resolve artifacts and load the schema. The model itself loads lazily.
    pub fn new(locator: ArtifactLocator) -> Self {
        let artifacts = locator.resolve();
        let (schema, model_path) = match &artifacts {
            Some(paths) => (FeatureSchema::load_or_empty(&paths.feature_list), paths.model.clone()),
            None => (FeatureSchema::empty(), PathBuf::new()),
        };

        Self {
            locator,
            artifacts: RwLock::new(artifacts),
            schema: RwLock::new(Arc::new(schema)),
            classifier: ClassifierEngine::new(model_path),
            explainer: ExplanationEngine::new(),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Current schema snapshot.
    pub fn schema(&self) -> Arc<FeatureSchema> {
        self.schema.read().clone()
    }

    /// Load model and explainer now instead of on the first request.
    pub fn warm_up(&self) {
        if let Err(e) = self.explainer.ensure_ready(&self.classifier) {
            tracing::warn!(error = %e, "Warm-up incomplete, requests will use fallbacks");
        }
    }

    pub fn predict(&self, raw: &RawFeatures) -> PredictionResult {
        let schema = self.schema();
        let row = aligned(raw, &schema);

        match self.classifier.classify(&row, &schema) {
            Ok(classification) => classification.result,
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Prediction fallback");
                fallback_prediction(raw, &e.to_string())
            }
        }
    }

    pub fn explain(&self, raw: &RawFeatures) -> ExplanationResult {
        let schema = self.schema();
        let row = aligned(raw, &schema);

        match self.explainer.explain(&row, &schema, &self.classifier) {
            Ok(result) => result,
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Explanation fallback");
                fallback_explanation(&e.to_string())
            }
        }
    }

    /// Predict and explain with one alignment, explaining the predicted class.
    pub fn assess(&self, raw: &RawFeatures) -> Assessment {
        let schema = self.schema();
        let row = aligned(raw, &schema);

        let classification = match self.classifier.classify(&row, &schema) {
            Ok(classification) => classification,
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Assessment fallback");
                let reason = e.to_string();
                return Assessment {
                    prediction: fallback_prediction(raw, &reason),
                    explanation: fallback_explanation(&reason),
                };
            }
        };

        let explanation = self
            .explainer
            .explain_for_class(&row, &schema, &self.classifier, classification.class_index)
            .unwrap_or_else(|e| {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Explanation fallback");
                fallback_explanation(&e.to_string())
            });

        Assessment {
            prediction: classification.result,
            explanation,
        }
    }

    pub fn status(&self) -> EngineStatus {
        let stats = self.classifier.stats();
        EngineStatus {
            schema: SchemaInfo::from(self.schema().as_ref()),
            model: self.classifier.state(),
            explainer: self.explainer.state(),
            artifacts: self.artifacts.read().clone(),
            inference_count: stats.inference_count,
            avg_latency_ms: stats.avg_latency_ms,
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
        }
    }

    /// Re-resolve artifacts, reload the schema and eagerly reload the model.
    pub fn reload(&self) -> EngineStatus {
        tracing::info!("Reloading model artifacts");

        let artifacts = self.locator.resolve();
        let (schema, model_path) = match &artifacts {
            Some(paths) => (FeatureSchema::load_or_empty(&paths.feature_list), paths.model.clone()),
            None => (FeatureSchema::empty(), PathBuf::new()),
        };

        *self.schema.write() = Arc::new(schema);
        *self.artifacts.write() = artifacts;
        self.classifier.reset(&model_path);
        self.explainer.reset();
        self.warm_up();

        let status = self.status();
        tracing::info!(model = ?status.model, explainer = ?status.explainer, "Reload complete");
        status
    }
}

fn aligned(raw: &RawFeatures, schema: &FeatureSchema) -> AlignedRow {
    let row = align(raw, schema);
    tracing::debug!(width = row.len(), missing = row.missing_count(), "Row aligned");
    row
}

// ============================================================================
// TESTS
// ============================================================================
