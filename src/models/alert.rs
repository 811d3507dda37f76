//! Alert model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::logic::features::RawFeatures;
use crate::logic::pipeline::EngineStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Weight used by the priority score.
    pub fn weight(self) -> f64 {
        match self {
            AlertSeverity::Low => 25.0,
            AlertSeverity::Medium => 50.0,
            AlertSeverity::High => 75.0,
            AlertSeverity::Critical => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionClass {
    TruePositive,
    FalsePositive,
    BenignPositive,
}

impl PredictionClass {
    /// Model label -> alert class. Unrecognised labels are treated as true positives.
    pub fn from_label(label: &str) -> Self {
        match label {
            "FalsePositive" => PredictionClass::FalsePositive,
            "BenignPositive" => PredictionClass::BenignPositive,
            _ => PredictionClass::TruePositive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "VM")]
    Vm,
    StorageAccount,
    #[serde(rename = "SQLDB")]
    SqlDb,
    #[serde(rename = "AKSCluster")]
    AksCluster,
    KeyVault,
    NetworkSecurityGroup,
    Identity,
    FunctionApp,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Vm => "VM",
            ResourceType::StorageAccount => "StorageAccount",
            ResourceType::SqlDb => "SQLDB",
            ResourceType::AksCluster => "AKSCluster",
            ResourceType::KeyVault => "KeyVault",
            ResourceType::NetworkSecurityGroup => "NetworkSecurityGroup",
            ResourceType::Identity => "Identity",
            ResourceType::FunctionApp => "FunctionApp",
        }
    }
}

/// One decimal place, ties to even.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// `severity_weight * confidence`, rounded to one decimal.
pub fn calculate_priority_score(severity: AlertSeverity, confidence: f64) -> f64 {
    round_one_decimal(severity.weight() * confidence)
}

/// `ALT-YYYYMMDD-XXXXXX`
pub fn generate_alert_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("ALT-{}-{}", now.format("%Y%m%d"), suffix)
}

fn default_risk_category() -> String {
    "Security".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub severity: AlertSeverity,
    pub prediction: PredictionClass,
    pub confidence: f64,
    pub priority_score: f64,
    #[serde(default)]
    pub mitre_techniques: Vec<String>,
    #[serde(default)]
    pub cis_controls: Vec<String>,
    #[serde(default)]
    pub cloud_policies: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_impact: Option<String>,
    #[serde(default = "default_risk_category")]
    pub risk_category: String,
    #[serde(default)]
    pub features: RawFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shap_values: Option<BTreeMap<String, f64>>,
}

/// Caller-supplied alert for `POST /api/alerts`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlert {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub resource_type: ResourceType,
    #[validate(length(min = 1, max = 256))]
    pub resource_name: String,
    pub severity: AlertSeverity,
    pub prediction: PredictionClass,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    #[serde(default)]
    pub mitre_techniques: Vec<String>,
    #[serde(default)]
    pub cis_controls: Vec<String>,
    #[serde(default)]
    pub cloud_policies: Vec<String>,
    #[serde(default)]
    pub business_impact: Option<String>,
    #[serde(default = "default_risk_category")]
    pub risk_category: String,
    #[serde(default)]
    pub features: RawFeatures,
    #[serde(default)]
    pub shap_values: Option<BTreeMap<String, f64>>,
}

impl CreateAlert {
    /// Assign id, timestamp and priority score.
    pub fn into_alert(self) -> EnhancedAlert {
        let now = Utc::now();
        EnhancedAlert {
            id: generate_alert_id(now),
            priority_score: calculate_priority_score(self.severity, self.confidence),
            title: self.title,
            description: self.description,
            resource_type: self.resource_type,
            resource_name: self.resource_name,
            severity: self.severity,
            prediction: self.prediction,
            confidence: self.confidence,
            mitre_techniques: self.mitre_techniques,
            cis_controls: self.cis_controls,
            cloud_policies: self.cloud_policies,
            timestamp: now,
            business_impact: self.business_impact,
            risk_category: self.risk_category,
            features: self.features,
            shap_values: self.shap_values,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    PriorityScore,
    Timestamp,
    Confidence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// `GET /api/alerts` query parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AlertQuery {
    pub severity: Option<AlertSeverity>,
    pub prediction: Option<PredictionClass>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            severity: None,
            prediction: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkloadStats {
    pub total_alerts: usize,
    pub auto_classified: usize,
    pub manual_review_needed: usize,
    pub workload_reduction_pct: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub benign_positives: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<EnhancedAlert>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub workload_stats: WorkloadStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeverityDistribution {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionDistribution {
    pub true_positive: usize,
    pub false_positive: usize,
    pub benign_positive: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_alerts: usize,
    pub severity_distribution: SeverityDistribution,
    pub prediction_distribution: PredictionDistribution,
    pub risk_categories: BTreeMap<String, usize>,
    pub overall_risk_score: u32,
    pub model_status: EngineStatus,
}

#[derive(Debug, Serialize)]
pub struct CreateAlertResponse {
    pub status: String,
    pub alert_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_score() {
        assert_eq!(calculate_priority_score(AlertSeverity::Critical, 0.93), 93.0);
        assert_eq!(calculate_priority_score(AlertSeverity::High, 0.8), 60.0);
        assert_eq!(calculate_priority_score(AlertSeverity::Low, 0.5), 12.5);
    }

    #[test]
    fn test_one_decimal_ties_to_even() {
        assert_eq!(round_one_decimal(6.25), 6.2);
        assert_eq!(round_one_decimal(0.75), 0.8);
        assert_eq!(round_one_decimal(33.33), 33.3);
    }

    #[test]
    fn test_alert_id_format() {
        let id = generate_alert_id(Utc::now());
        assert!(id.starts_with("ALT-"));
        assert_eq!(id.len(), "ALT-20260101-ABCDEF".len());
        assert!(id[13..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_prediction_class_mapping() {
        assert_eq!(PredictionClass::from_label("FalsePositive"), PredictionClass::FalsePositive);
        assert_eq!(PredictionClass::from_label("BenignPositive"), PredictionClass::BenignPositive);
        assert_eq!(PredictionClass::from_label("TruePositive"), PredictionClass::TruePositive);
        assert_eq!(PredictionClass::from_label("Unknown"), PredictionClass::TruePositive);
        assert_eq!(
            serde_json::to_string(&PredictionClass::BenignPositive).unwrap(),
            "\"BENIGN_POSITIVE\""
        );
    }

    #[test]
    fn test_resource_type_wire_names() {
        for rt in [ResourceType::Vm, ResourceType::SqlDb, ResourceType::AksCluster, ResourceType::KeyVault] {
            let wire = serde_json::to_string(&rt).unwrap();
            assert_eq!(wire, format!("\"{}\"", rt.as_str()));
        }
    }

    #[test]
    fn test_query_validation() {
        let mut query = AlertQuery::default();
        assert!(query.validate().is_ok());
        query.page_size = 101;
        assert!(query.validate().is_err());
        query.page_size = 10;
        query.page = 0;
        assert!(query.validate().is_err());
    }
}
