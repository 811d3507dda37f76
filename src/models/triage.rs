//! Triage run model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::logic::advice::Advice;
use crate::logic::features::RawFeatures;
use super::alert::{EnhancedAlert, ResourceType};

/// `POST /api/triage` body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TriageRequest {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    pub resource_type: ResourceType,
    #[validate(length(min = 1, max = 256))]
    pub resource_name: String,
    #[serde(default)]
    pub features: RawFeatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Fallback,
}

/// One recorded stage of a triage run.
#[derive(Debug, Clone, Serialize)]
pub struct TriageStep {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageResponse {
    pub triage_id: String,
    pub steps: Vec<TriageStep>,
    pub result: EnhancedAlert,
    pub remediation: Advice,
}
