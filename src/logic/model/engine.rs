//! Classifier Engine
//!
//! Owns the booster behind a lock-guarded lazy slot:
//! `Unloaded -> Loaded` or `Unloaded -> LoadFailed`. The first caller
//! performs the load under the write lock; concurrent callers wait and
//! observe its outcome. `LoadFailed` is sticky until `reset`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

use crate::logic::features::{AlignedRow, FeatureSchema};
use super::booster::Booster;
use super::error::InferenceError;
use super::types::{LoadState, PredictionResult, PredictionSource};

// ============================================================================
// STATE
// ============================================================================

enum ModelSlot {
    Unloaded,
    Loaded(Arc<Booster>),
    LoadFailed(String),
}

/// Successful classification plus what the explainer needs to stay consistent.
#[derive(Debug, Clone)]
pub struct Classification {
    pub result: PredictionResult,
    pub class_index: usize,
}

/// Latency stats for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierStats {
    pub inference_count: u64,
    pub avg_latency_ms: f64,
}

pub struct ClassifierEngine {
    model_path: RwLock<PathBuf>,
    slot: RwLock<ModelSlot>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl ClassifierEngine {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: RwLock::new(model_path.into()),
            slot: RwLock::new(ModelSlot::Unloaded),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Engine around an already-built booster.
    pub fn with_booster(booster: Booster) -> Self {
        let engine = Self::new(PathBuf::from("<memory>"));
        *engine.slot.write() = ModelSlot::Loaded(Arc::new(booster));
        engine
    }

    /// Back to `Unloaded`, optionally pointing at a new artifact.
    pub fn reset(&self, model_path: &Path) {
        let mut slot = self.slot.write();
        *self.model_path.write() = model_path.to_path_buf();
        *slot = ModelSlot::Unloaded;
    }

    pub fn state(&self) -> LoadState {
        match self.slot.try_read() {
            Some(slot) => match &*slot {
                ModelSlot::Unloaded => LoadState::Unloaded,
                ModelSlot::Loaded(_) => LoadState::Loaded,
                ModelSlot::LoadFailed(e) => LoadState::LoadFailed(e.clone()),
            },
            // Write lock held: a load is in progress
            None => LoadState::Loading,
        }
    }

    /// Loaded booster, loading it on first use.
    pub fn ensure_loaded(&self) -> Result<Arc<Booster>, InferenceError> {
        if let Some(outcome) = Self::observe(&self.slot.read()) {
            return outcome;
        }

        let mut slot = self.slot.write();
        if matches!(*slot, ModelSlot::Unloaded) {
            *slot = self.load();
        }
        Self::observe(&slot).unwrap_or(Err(InferenceError::NotLoaded))
    }

    fn observe(slot: &ModelSlot) -> Option<Result<Arc<Booster>, InferenceError>> {
        match slot {
            ModelSlot::Unloaded => None,
            ModelSlot::Loaded(booster) => Some(Ok(booster.clone())),
            ModelSlot::LoadFailed(e) => Some(Err(InferenceError::LoadFailed(e.clone()))),
        }
    }

    fn load(&self) -> ModelSlot {
        let path = self.model_path.read().clone();
        let start = Instant::now();
        tracing::info!(path = %path.display(), "Loading model");

        match Booster::load(&path) {
            Ok(booster) => {
                tracing::info!(
                    path = %path.display(),
                    trees = booster.trees().len(),
                    features = booster.num_feature(),
                    classes = booster.num_classes(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model loaded successfully"
                );
                ModelSlot::Loaded(Arc::new(booster))
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Model load failed");
                ModelSlot::LoadFailed(e.to_string())
            }
        }
    }

    /// Classify an aligned row. Errors are returned, not recovered.
    pub fn classify(&self, row: &AlignedRow, schema: &FeatureSchema) -> Result<Classification, InferenceError> {
        let start = Instant::now();
        let booster = self.ensure_loaded()?;
        let classification = classify_with(&booster, row, schema)?;

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        Ok(classification)
    }

    pub fn stats(&self) -> ClassifierStats {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };
        ClassifierStats {
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

/// Classification against a specific booster.
pub fn classify_with(
    booster: &Booster,
    row: &AlignedRow,
    schema: &FeatureSchema,
) -> Result<Classification, InferenceError> {
    if schema.num_classes() != booster.num_classes() {
        return Err(InferenceError::LabelMismatch {
            labels: schema.num_classes(),
            classes: booster.num_classes(),
        });
    }

    let raw = booster.predict(&row.encode(schema))?;

    let probabilities = raw
        .probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| (schema.label_for(i).unwrap_or("Unknown").to_string(), *p))
        .collect();
    let label = schema.label_for(raw.class_index).unwrap_or("Unknown").to_string();

    Ok(Classification {
        result: PredictionResult {
            label,
            confidence: raw.probabilities[raw.class_index],
            probabilities,
            source: PredictionSource::Model,
            fallback_reason: None,
        },
        class_index: raw.class_index,
    })
}

// ============================================================================
// TESTS
// ============================================================================
