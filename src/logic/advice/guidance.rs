//! Role-Aware Guidance
//!
//! Per-alert remediation phrased for one audience. The knowledge base is
//! asked with a persona prompt built from the stored alert (including its
//! attributions); when it cannot answer, the playbook entry for the
//! resource type is returned with generic next steps.

use std::collections::BTreeMap;

use crate::models::{EnhancedAlert, GuidanceResponse, UserRole};
use super::{playbook_for, AdviceClient};

/// Documents requested from the knowledge base.
const GUIDANCE_TOP_K: usize = 5;

/// Attributions quoted in a prompt or analysis.
const TOP_DRIVERS: usize = 5;

const CLOUD_ENGINEER_PROMPT: &str = "\
You are a senior cloud security engineer. Provide concrete Azure remediation steps.
Include:
- Specific Azure CLI or PowerShell commands
- NSG rule modifications if applicable
- RBAC/IAM changes needed
- Encryption and network security recommendations
- Azure Policy remediation tasks

Be technical and actionable. Reference specific Azure services and configurations.";

const NON_TECHNICAL_PROMPT: &str = "\
You are explaining a security issue to a business executive with no technical background.
Provide:
- Plain language explanation of what happened
- Business impact (financial, regulatory, reputational)
- What happens if this is ignored
- What to tell your IT team to fix (in simple terms)
- Estimated urgency and timeline

Avoid technical jargon. Focus on business risk and outcomes.";

const ML_ENGINEER_PROMPT: &str = "\
You are a machine learning engineer analyzing model predictions.
Provide:
- Technical analysis linking feature values to SHAP contributions
- Connection between features and MITRE ATT&CK tactics
- Mapping to CIS Azure Benchmark controls
- Model confidence interpretation
- Potential false positive indicators

Focus on explainability and model behavior analysis.";

const GENERIC_STEPS: [&str; 3] = [
    "1. Review alert details manually",
    "2. Consult security documentation",
    "3. Contact SOC team for assistance",
];

pub fn role_prompt(role: UserRole) -> &'static str {
    match role {
        UserRole::CloudEngineer => CLOUD_ENGINEER_PROMPT,
        UserRole::NonTechnical => NON_TECHNICAL_PROMPT,
        UserRole::MlEngineer => ML_ENGINEER_PROMPT,
    }
}

/// Prompt template per role, keyed by wire name.
pub fn templates() -> BTreeMap<&'static str, &'static str> {
    UserRole::ALL
        .iter()
        .map(|role| (role.as_str(), role_prompt(*role)))
        .collect()
}

/// Strongest attributions first.
fn top_drivers(alert: &EnhancedAlert) -> Vec<(&str, f64)> {
    let mut drivers: Vec<(&str, f64)> = alert
        .shap_values
        .iter()
        .flatten()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    drivers.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    drivers.truncate(TOP_DRIVERS);
    drivers
}

pub fn build_query(alert: &EnhancedAlert, role: UserRole) -> String {
    let mut query = format!(
        "{}\n\nAlert: {}\nResource: {} ({})\nVerdict: {:?} at {:.0}% confidence, severity {:?}\n",
        role_prompt(role),
        alert.title,
        alert.resource_name,
        alert.resource_type.as_str(),
        alert.prediction,
        alert.confidence * 100.0,
        alert.severity,
    );

    let drivers = top_drivers(alert);
    if !drivers.is_empty() {
        query.push_str("Top feature contributions:\n");
        for (name, value) in drivers {
            query.push_str(&format!("- {}: {:+.3}\n", name, value));
        }
    }

    query.push_str("\nProvide guidance appropriate for your role.");
    query
}

/// Attribution table for the ML audience; `None` without attributions.
fn technical_analysis(alert: &EnhancedAlert) -> Option<String> {
    let drivers = top_drivers(alert);
    if drivers.is_empty() {
        return None;
    }

    let mut table = String::from("| Feature | Value | SHAP Contribution |\n|---|---|---|\n");
    for (name, value) in drivers {
        let observed = alert
            .features
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "missing".to_string());
        table.push_str(&format!("| {} | {} | {:+.3} |\n", name, observed, value));
    }
    table.push_str(&format!(
        "\nModel predicted {:?} with {:.0}% confidence.",
        alert.prediction,
        alert.confidence * 100.0
    ));
    Some(table)
}

fn business_context(alert: &EnhancedAlert) -> String {
    format!(
        "Severity: {:?}. Priority score: {}. Risk area: {}.",
        alert.severity, alert.priority_score, alert.risk_category
    )
}

pub async fn guidance_for(advice: &AdviceClient, alert: &EnhancedAlert, role: UserRole) -> GuidanceResponse {
    let (business, technical) = match role {
        UserRole::CloudEngineer => (None, None),
        UserRole::NonTechnical => (Some(business_context(alert)), None),
        UserRole::MlEngineer => (None, technical_analysis(alert)),
    };

    match advice.ask(&build_query(alert, role), GUIDANCE_TOP_K).await {
        Ok(answer) => GuidanceResponse {
            alert_id: alert.id.clone(),
            role,
            guidance: answer.advice,
            remediation_steps: vec!["See guidance above for detailed steps".to_string()],
            business_context: business,
            technical_analysis: technical,
            sources: answer.sources,
            fallback_reason: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, alert_id = %alert.id, role = role.as_str(), "Guidance fallback to playbook");
            let playbook = playbook_for(alert.resource_type);
            GuidanceResponse {
                alert_id: alert.id.clone(),
                role,
                guidance: playbook.advice,
                remediation_steps: GENERIC_STEPS.iter().map(|s| s.to_string()).collect(),
                business_context: business,
                technical_analysis: technical,
                sources: playbook.sources,
                fallback_reason: Some(e.to_string()),
            }
        }
    }
}
