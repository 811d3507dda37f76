//! Triage Orchestrator
//!
//! One end-to-end pass over an incoming alert: classification and
//! explanation through the inference pipeline, remediation from the
//! knowledge base (or the playbook), then the stored alert. Each stage
//! is recorded as a step so the caller can show what happened.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::logic::advice::{playbook_for, AdviceClient};
use crate::logic::alerts::AlertStore;
use crate::logic::model::{fallback_explanation, fallback_prediction};
use crate::logic::pipeline::{Assessment, InferencePipeline};
use crate::models::{
    calculate_priority_score, generate_alert_id, AlertSeverity, EnhancedAlert, PredictionClass,
    ResourceType, StepStatus, TriageRequest, TriageResponse, TriageStep,
};

/// Documents requested from the knowledge base.
const KNOWLEDGE_TOP_K: usize = 3;

/// Telemetry marker that escalates an alert to critical.
const CREDENTIAL_ATTACK_MARKER: &str = "failed_login";

const ADVICE_PREVIEW_CHARS: usize = 100;

struct StepLog {
    steps: Vec<TriageStep>,
}

impl StepLog {
    fn new() -> Self {
        Self { steps: Vec::new() }
    }

    fn add(&mut self, name: &str, description: String, status: StepStatus, data: serde_json::Value) {
        self.steps.push(TriageStep {
            id: (self.steps.len() + 1).to_string(),
            name: name.to_string(),
            description,
            status,
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
        });
    }
}

/// Critical when the marker appears anywhere in the telemetry, key or value.
pub fn severity_for(prediction: PredictionClass, request: &TriageRequest) -> AlertSeverity {
    let telemetry = serde_json::to_string(&request.features).unwrap_or_default();
    if telemetry.contains(CREDENTIAL_ATTACK_MARKER) {
        AlertSeverity::Critical
    } else if prediction == PredictionClass::TruePositive {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

pub fn risk_category(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::StorageAccount | ResourceType::SqlDb => "Data",
        ResourceType::Identity | ResourceType::KeyVault => "Identity",
        ResourceType::NetworkSecurityGroup => "Network",
        ResourceType::Vm | ResourceType::AksCluster | ResourceType::FunctionApp => "Compute",
    }
}

/// Run inference off the async runtime.
async fn assess_blocking(pipeline: Arc<InferencePipeline>, request: &TriageRequest) -> Assessment {
    let features = request.features.clone();
    match tokio::task::spawn_blocking(move || pipeline.assess(&features)).await {
        Ok(assessment) => assessment,
        Err(e) => {
            tracing::error!(error = %e, "Inference task failed");
            let reason = format!("inference task failed: {}", e);
            Assessment {
                prediction: fallback_prediction(&request.features, &reason),
                explanation: fallback_explanation(&reason),
            }
        }
    }
}

pub async fn run_triage(
    pipeline: Arc<InferencePipeline>,
    advice: &AdviceClient,
    alerts: &AlertStore,
    request: TriageRequest,
) -> TriageResponse {
    let triage_id = format!("TRG-{}", &Uuid::new_v4().simple().to_string()[..6].to_uppercase());
    let mut log = StepLog::new();

    log.add(
        "Telemetry Intake",
        format!("Received telemetry for {}", request.resource_name),
        StepStatus::Completed,
        json!({ "title": request.title, "telemetry": request.features }),
    );

    // Classification + explanation
    let Assessment { prediction, explanation } = assess_blocking(pipeline, &request).await;

    let status = if prediction.is_fallback() { StepStatus::Fallback } else { StepStatus::Completed };
    log.add(
        "ML Classification",
        format!(
            "Classified incident as {} with {}% confidence",
            prediction.label,
            (prediction.confidence * 100.0) as u32
        ),
        status,
        json!({
            "prediction": prediction.label,
            "confidence": prediction.confidence,
            "probabilities": prediction.probabilities,
            "fallback_reason": prediction.fallback_reason,
        }),
    );

    let status = if explanation.is_fallback() { StepStatus::Fallback } else { StepStatus::Completed };
    log.add(
        "Explanation",
        format!("Attributed prediction to {} features", explanation.explanation.len()),
        status,
        json!({
            "top_features": explanation.explanation.iter().take(5).collect::<Vec<_>>(),
            "base_value": explanation.base_value,
            "note": explanation.note,
        }),
    );

    // Remediation
    let query = format!(
        "Provide remediation for {} in {}. Impact: {}.",
        request.title,
        request.resource_type.as_str(),
        serde_json::Value::Object(request.features.clone())
    );
    let remediation = match advice.ask(&query, KNOWLEDGE_TOP_K).await {
        Ok(answer) => {
            let preview: String = answer.advice.chars().take(ADVICE_PREVIEW_CHARS).collect();
            log.add(
                "Remediation",
                "Knowledge base queried for contextual fix actions".to_string(),
                StepStatus::Completed,
                json!({ "advice_preview": format!("{}...", preview), "source_count": answer.sources.len() }),
            );
            answer
        }
        Err(e) => {
            tracing::warn!(error = %e, resource_type = request.resource_type.as_str(), "Knowledge base bypassed, using playbook");
            log.add(
                "Remediation",
                format!("Using built-in playbook remediation ({})", e),
                StepStatus::Fallback,
                json!({ "status": "fallback" }),
            );
            playbook_for(request.resource_type)
        }
    };

    // Alert
    let class = PredictionClass::from_label(&prediction.label);
    let severity = severity_for(class, &request);
    let now = Utc::now();
    let alert = EnhancedAlert {
        id: generate_alert_id(now),
        description: format!(
            "Triaged alert for {}. Details: {}",
            request.resource_name,
            serde_json::Value::Object(request.features.clone())
        ),
        resource_type: request.resource_type,
        resource_name: request.resource_name.clone(),
        severity,
        prediction: class,
        confidence: prediction.confidence,
        priority_score: calculate_priority_score(severity, prediction.confidence),
        mitre_techniques: Vec::new(),
        cis_controls: Vec::new(),
        cloud_policies: Vec::new(),
        timestamp: now,
        business_impact: None,
        risk_category: risk_category(request.resource_type).to_string(),
        shap_values: (!explanation.is_fallback()).then(|| explanation.as_map()),
        features: request.features,
        title: request.title,
    };

    alerts.insert(alert.clone());
    log.add(
        "Alert Stored",
        format!("Alert {} stored with priority {}", alert.id, alert.priority_score),
        StepStatus::Completed,
        json!({ "alert_id": alert.id, "severity": alert.severity }),
    );
    tracing::info!(triage_id = %triage_id, alert_id = %alert.id, prediction = %prediction.label, "Triage complete");

    TriageResponse {
        triage_id,
        steps: log.steps,
        result: alert,
        remediation,
    }
}

// ============================================================================
// TESTS
// ============================================================================
