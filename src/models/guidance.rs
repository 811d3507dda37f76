//! Role-aware guidance model

use serde::{Deserialize, Serialize};

/// Audience the guidance is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    CloudEngineer,
    NonTechnical,
    MlEngineer,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::CloudEngineer, UserRole::NonTechnical, UserRole::MlEngineer];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::CloudEngineer => "CLOUD_ENGINEER",
            UserRole::NonTechnical => "NON_TECHNICAL",
            UserRole::MlEngineer => "ML_ENGINEER",
        }
    }
}

/// `GET /api/alerts/:id/guidance` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuidanceQuery {
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceResponse {
    pub alert_id: String,
    pub role: UserRole,
    pub guidance: String,
    pub remediation_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_analysis: Option<String>,
    pub sources: Vec<serde_json::Value>,
    /// Set when the knowledge base could not answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}
