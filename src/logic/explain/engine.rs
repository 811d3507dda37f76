//! Explanation Engine
//!
//! Lazily builds a `TreeExplainer` over the classifier's booster and turns
//! its attribution vectors into a ranked `ExplanationResult`. Explainer
//! initialisation is tracked separately from model loading: a booster can
//! classify fine and still be unusable for attribution.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::logic::features::{AlignedRow, FeatureSchema};
use crate::logic::model::{classify_with, Booster, ClassifierEngine, LoadState};
use super::error::ExplainError;
use super::tree_shap::TreeExplainer;
use super::types::{rank_attributions, ExplanationResult};

enum ExplainerSlot {
    Uninit,
    Ready(Arc<TreeExplainer>),
    Failed(String),
}

pub struct ExplanationEngine {
    slot: RwLock<ExplainerSlot>,
}

impl Default for ExplanationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplanationEngine {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(ExplainerSlot::Uninit),
        }
    }

    /// Forget the current explainer (model reload).
    pub fn reset(&self) {
        *self.slot.write() = ExplainerSlot::Uninit;
    }

    pub fn state(&self) -> LoadState {
        match self.slot.try_read() {
            Some(slot) => match &*slot {
                ExplainerSlot::Uninit => LoadState::Unloaded,
                ExplainerSlot::Ready(_) => LoadState::Loaded,
                ExplainerSlot::Failed(e) => LoadState::LoadFailed(e.clone()),
            },
            None => LoadState::Loading,
        }
    }

    /// Explainer for the classifier's current booster, built on first use.
    pub fn ensure_ready(&self, classifier: &ClassifierEngine) -> Result<Arc<TreeExplainer>, ExplainError> {
        let booster = classifier.ensure_loaded()?;

        if let Some(outcome) = Self::observe(&self.slot.read(), &booster) {
            return outcome;
        }

        let mut slot = self.slot.write();
        if let Some(outcome) = Self::observe(&slot, &booster) {
            return outcome;
        }

        match TreeExplainer::new(booster) {
            Ok(explainer) => {
                tracing::info!("Explainer initialized");
                let explainer = Arc::new(explainer);
                *slot = ExplainerSlot::Ready(explainer.clone());
                Ok(explainer)
            }
            Err(e) => {
                tracing::error!(error = %e, "Explainer init failed");
                *slot = ExplainerSlot::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// `None` when the slot has to be (re)built for `booster`.
    fn observe(slot: &ExplainerSlot, booster: &Arc<Booster>) -> Option<Result<Arc<TreeExplainer>, ExplainError>> {
        match slot {
            ExplainerSlot::Uninit => None,
            ExplainerSlot::Ready(explainer) if Arc::ptr_eq(explainer.booster(), booster) => {
                Some(Ok(explainer.clone()))
            }
            // Built for a booster that has since been replaced
            ExplainerSlot::Ready(_) => None,
            ExplainerSlot::Failed(e) => Some(Err(ExplainError::Init(e.clone()))),
        }
    }

    /// Explain the class the classifier predicts for `row`.
    pub fn explain(
        &self,
        row: &AlignedRow,
        schema: &FeatureSchema,
        classifier: &ClassifierEngine,
    ) -> Result<ExplanationResult, ExplainError> {
        let explainer = self.ensure_ready(classifier)?;
        // Same booster as the attributions, so the index cannot drift
        let classification = classify_with(explainer.booster(), row, schema)?;
        attribute(&explainer, row, schema, classification.class_index)
    }

    /// Explain a class index already produced by the classifier.
    pub fn explain_for_class(
        &self,
        row: &AlignedRow,
        schema: &FeatureSchema,
        classifier: &ClassifierEngine,
        class_index: usize,
    ) -> Result<ExplanationResult, ExplainError> {
        let explainer = self.ensure_ready(classifier)?;
        attribute(&explainer, row, schema, class_index)
    }
}

fn attribute(
    explainer: &TreeExplainer,
    row: &AlignedRow,
    schema: &FeatureSchema,
    class_index: usize,
) -> Result<ExplanationResult, ExplainError> {
    let booster = explainer.booster();
    let group = booster.group_for_class(class_index);

    let phi = explainer.shap_values(&row.encode(schema))?;
    let values = phi.get(group).ok_or(ExplainError::ShapeMismatch {
        expected: booster.num_groups(),
        got: group,
    })?;

    Ok(ExplanationResult {
        prediction: schema.label_for(class_index).unwrap_or("Unknown").to_string(),
        explanation: rank_attributions(schema.feature_names(), values),
        base_value: explainer.base_value(group),
        note: None,
    })
}

// ============================================================================
// TESTS
// ============================================================================
