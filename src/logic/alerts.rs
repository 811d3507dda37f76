//! Alert Store
//!
//! In-memory, newest-first collection of triaged alerts with bounded
//! capacity. Filtering, sorting, pagination and dashboard aggregates.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::RwLock;

use crate::logic::pipeline::EngineStatus;
use crate::models::{
    round_one_decimal, AlertQuery, AlertSeverity, AlertsResponse, EnhancedAlert, MetricsSummary,
    PredictionClass, PredictionDistribution, SeverityDistribution, SortField, SortOrder, WorkloadStats,
};

/// Confidence at which an alert counts as auto-classified.
pub const AUTO_CLASSIFY_CONFIDENCE: f64 = 0.7;

pub const DEFAULT_CAPACITY: usize = 500;

pub struct AlertStore {
    alerts: RwLock<VecDeque<EnhancedAlert>>,
    capacity: usize,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AlertStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Insert at the front, trimming the oldest beyond capacity.
    pub fn insert(&self, alert: EnhancedAlert) {
        let mut alerts = self.alerts.write();
        alerts.push_front(alert);
        while alerts.len() > self.capacity {
            if let Some(dropped) = alerts.pop_back() {
                tracing::debug!(alert_id = %dropped.id, "Alert evicted");
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<EnhancedAlert> {
        self.alerts.read().iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    pub fn list(&self, query: &AlertQuery) -> AlertsResponse {
        let alerts = self.alerts.read();

        let mut matching: Vec<&EnhancedAlert> = alerts
            .iter()
            .filter(|a| query.severity.map_or(true, |s| a.severity == s))
            .filter(|a| query.prediction.map_or(true, |p| a.prediction == p))
            .collect();

        matching.sort_by(|a, b| {
            let ord = match query.sort_by {
                SortField::PriorityScore => a.priority_score.total_cmp(&b.priority_score),
                SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
                SortField::Confidence => a.confidence.total_cmp(&b.confidence),
            };
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matching.len();
        let page_size = query.page_size.max(1) as usize;
        let start = (query.page.max(1) as usize - 1).saturating_mul(page_size);
        let page = matching
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        AlertsResponse {
            alerts: page,
            total,
            page: query.page,
            page_size: query.page_size,
            workload_stats: workload_stats(alerts.iter()),
        }
    }

    pub fn metrics(&self, model_status: EngineStatus) -> MetricsSummary {
        let alerts = self.alerts.read();
        let total = alerts.len();

        let mut severity = SeverityDistribution::default();
        let mut prediction = PredictionDistribution::default();
        let mut risk_categories = BTreeMap::new();

        for alert in alerts.iter() {
            match alert.severity {
                AlertSeverity::Critical => severity.critical += 1,
                AlertSeverity::High => severity.high += 1,
                AlertSeverity::Medium => severity.medium += 1,
                AlertSeverity::Low => severity.low += 1,
            }
            match alert.prediction {
                PredictionClass::TruePositive => prediction.true_positive += 1,
                PredictionClass::FalsePositive => prediction.false_positive += 1,
                PredictionClass::BenignPositive => prediction.benign_positive += 1,
            }
            *risk_categories.entry(alert.risk_category.clone()).or_insert(0) += 1;
        }

        let overall_risk_score = risk_score(&severity, &prediction, total);

        MetricsSummary {
            total_alerts: total,
            severity_distribution: severity,
            prediction_distribution: prediction,
            risk_categories,
            overall_risk_score,
            model_status,
        }
    }
}

fn workload_stats<'a>(alerts: impl Iterator<Item = &'a EnhancedAlert>) -> WorkloadStats {
    let mut stats = WorkloadStats::default();
    for alert in alerts {
        stats.total_alerts += 1;
        if alert.confidence >= AUTO_CLASSIFY_CONFIDENCE {
            stats.auto_classified += 1;
        }
        match alert.prediction {
            PredictionClass::TruePositive => stats.true_positives += 1,
            PredictionClass::FalsePositive => stats.false_positives += 1,
            PredictionClass::BenignPositive => stats.benign_positives += 1,
        }
    }
    stats.manual_review_needed = stats.total_alerts - stats.auto_classified;
    let pct = stats.auto_classified as f64 / stats.total_alerts.max(1) as f64 * 100.0;
    stats.workload_reduction_pct = round_one_decimal(pct);
    stats
}

/// Weighted severity/true-positive density, capped at 100.
fn risk_score(severity: &SeverityDistribution, prediction: &PredictionDistribution, total: usize) -> u32 {
    let weighted = severity.critical * 25 + severity.high * 15 + severity.medium * 5 + prediction.true_positive * 10;
    let score = (weighted as f64 / total.max(1) as f64 * 10.0).round_ties_even();
    score.min(100.0) as u32
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{calculate_priority_score, ResourceType};
    use chrono::{Duration, Utc};

    fn alert(id: &str, severity: AlertSeverity, prediction: PredictionClass, confidence: f64, age_secs: i64) -> EnhancedAlert {
        EnhancedAlert {
            id: id.to_string(),
            title: format!("alert {}", id),
            description: String::new(),
            resource_type: ResourceType::Vm,
            resource_name: "vm-01".to_string(),
            severity,
            prediction,
            confidence,
            priority_score: calculate_priority_score(severity, confidence),
            mitre_techniques: vec![],
            cis_controls: vec![],
            cloud_policies: vec![],
            timestamp: Utc::now() - Duration::seconds(age_secs),
            business_impact: None,
            risk_category: "Compute".to_string(),
            features: Default::default(),
            shap_values: None,
        }
    }

    fn seeded() -> AlertStore {
        let store = AlertStore::new(10);
        store.insert(alert("a", AlertSeverity::Critical, PredictionClass::TruePositive, 0.93, 40));
        store.insert(alert("b", AlertSeverity::High, PredictionClass::TruePositive, 0.6, 30));
        store.insert(alert("c", AlertSeverity::Medium, PredictionClass::BenignPositive, 0.72, 20));
        store.insert(alert("d", AlertSeverity::Low, PredictionClass::FalsePositive, 0.9, 10));
        store
    }

    fn ids(response: &AlertsResponse) -> Vec<&str> {
        response.alerts.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_newest_first_and_capacity() {
        let store = AlertStore::new(3);
        for id in ["1", "2", "3", "4"] {
            store.insert(alert(id, AlertSeverity::Low, PredictionClass::FalsePositive, 0.5, 0));
        }

        assert_eq!(store.len(), 3);
        assert!(store.get("1").is_none());
        let query = AlertQuery { sort_by: SortField::Timestamp, ..AlertQuery::default() };
        assert_eq!(store.list(&query).alerts[0].id, "4");
    }

    #[test]
    fn test_default_sort_is_priority_desc() {
        let response = seeded().list(&AlertQuery::default());
        assert_eq!(ids(&response), vec!["a", "b", "c", "d"]);
        assert_eq!(response.total, 4);
    }

    #[test]
    fn test_filter_and_sort_ascending() {
        let store = seeded();
        let query = AlertQuery {
            prediction: Some(PredictionClass::TruePositive),
            sort_by: SortField::Confidence,
            sort_order: SortOrder::Asc,
            ..AlertQuery::default()
        };

        let response = store.list(&query);
        assert_eq!(ids(&response), vec!["b", "a"]);
        assert_eq!(response.total, 2);
        // Workload stats cover the whole store, not the filtered view
        assert_eq!(response.workload_stats.total_alerts, 4);
    }

    #[test]
    fn test_pagination() {
        let store = seeded();
        let query = AlertQuery { page: 2, page_size: 3, ..AlertQuery::default() };
        let response = store.list(&query);
        assert_eq!(ids(&response), vec!["d"]);
        assert_eq!(response.total, 4);

        let beyond = AlertQuery { page: 5, page_size: 3, ..AlertQuery::default() };
        assert!(store.list(&beyond).alerts.is_empty());
    }

    #[test]
    fn test_workload_stats() {
        let stats = seeded().list(&AlertQuery::default()).workload_stats;
        assert_eq!(stats.auto_classified, 3);
        assert_eq!(stats.manual_review_needed, 1);
        assert_eq!(stats.workload_reduction_pct, 75.0);
        assert_eq!(stats.true_positives, 2);
        assert_eq!(stats.false_positives, 1);
        assert_eq!(stats.benign_positives, 1);
    }

    #[test]
    fn test_workload_share_ties_to_even() {
        let store = AlertStore::new(20);
        store.insert(alert("auto", AlertSeverity::High, PredictionClass::TruePositive, 0.9, 0));
        for i in 0..15 {
            store.insert(alert(&format!("m{}", i), AlertSeverity::Low, PredictionClass::FalsePositive, 0.4, 0));
        }

        let stats = store.list(&AlertQuery::default()).workload_stats;
        // 1 / 16 = 6.25%
        assert_eq!(stats.workload_reduction_pct, 6.2);
        assert_eq!(stats.manual_review_needed, 15);
    }

    #[test]
    fn test_risk_score() {
        let severity = SeverityDistribution { critical: 1, high: 1, medium: 1, low: 1 };
        let prediction = PredictionDistribution { true_positive: 2, false_positive: 1, benign_positive: 1 };
        // (25 + 15 + 5 + 20) / 4 * 10 = 162.5, capped
        assert_eq!(risk_score(&severity, &prediction, 4), 100);

        let calm = SeverityDistribution { critical: 0, high: 0, medium: 1, low: 3 };
        let none = PredictionDistribution { true_positive: 0, false_positive: 4, benign_positive: 0 };
        // 5 / 4 * 10 = 12.5, ties to even
        assert_eq!(risk_score(&calm, &none, 4), 12);
        assert_eq!(risk_score(&SeverityDistribution::default(), &PredictionDistribution::default(), 0), 0);
    }
}
