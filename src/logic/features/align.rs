//! Input Aligner
//!
//! Maps an arbitrary request payload onto the schema's column order.
//! Column kind is inferred from each incoming value:
//! - text that does not parse as a number -> categorical token
//! - numbers, booleans, numeric strings    -> numeric
//! - arrays / objects                      -> categorical (compact JSON)
//! - absent, null, empty or non-finite     -> missing
//!
//! Keys not in the schema are ignored. Never fails.

use serde::Serialize;
use serde_json::{Map, Value};

use super::schema::FeatureSchema;

/// Request-time feature payload (attacker controlled, any shape).
pub type RawFeatures = Map<String, Value>;

/// One aligned cell, tagged with the kind inferred from its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AlignedValue {
    Missing,
    Numeric(f64),
    Categorical(String),
}

impl AlignedValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, AlignedValue::Missing)
    }
}

/// Fixed-width row in training column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    values: Vec<AlignedValue>,
}

impl AlignedRow {
    pub fn values(&self) -> &[AlignedValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Dense model input; NaN marks a missing value.
    ///
    /// Categorical tokens become their training code, or NaN when the
    /// schema declares no code for the token.
    pub fn encode(&self, schema: &FeatureSchema) -> Vec<f64> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                AlignedValue::Missing => f64::NAN,
                AlignedValue::Numeric(v) => *v,
                AlignedValue::Categorical(token) => schema
                    .feature_names()
                    .get(i)
                    .and_then(|name| schema.category_code(name, token))
                    .map(f64::from)
                    .unwrap_or(f64::NAN),
            })
            .collect()
    }
}

/// Align a payload to the schema's feature order.
pub fn align(raw: &RawFeatures, schema: &FeatureSchema) -> AlignedRow {
    let values = schema
        .feature_names()
        .iter()
        .map(|name| match raw.get(name) {
            Some(value) => align_value(value),
            None => AlignedValue::Missing,
        })
        .collect();

    AlignedRow { values }
}

fn align_value(value: &Value) -> AlignedValue {
    match value {
        Value::Null => AlignedValue::Missing,
        Value::Bool(_) | Value::Number(_) => match coerce_numeric(value) {
            Some(v) => AlignedValue::Numeric(v),
            None => AlignedValue::Missing,
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return AlignedValue::Missing;
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => AlignedValue::Numeric(v),
                Ok(_) => AlignedValue::Missing,
                Err(_) => AlignedValue::Categorical(s.clone()),
            }
        }
        Value::Array(_) | Value::Object(_) => AlignedValue::Categorical(value.to_string()),
    }
}

/// Best-effort numeric coercion of a single JSON value.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            vec![
                "alert_burst_count".to_string(),
                "Category".to_string(),
                "hour_of_day".to_string(),
            ],
            HashMap::new(),
            HashMap::from([(
                "Category".to_string(),
                vec!["Execution".to_string(), "InitialAccess".to_string()],
            )]),
        )
        .unwrap()
    }

    fn raw(value: Value) -> RawFeatures {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_empty_input_is_all_missing() {
        let row = align(&RawFeatures::new(), &schema());
        assert_eq!(row.len(), 3);
        assert!(row.values().iter().all(AlignedValue::is_missing));
        assert_eq!(row.missing_count(), 3);
    }

    #[test]
    fn test_empty_schema_yields_empty_row() {
        let row = align(&raw(json!({"alert_burst_count": 3})), &FeatureSchema::empty());
        assert!(row.is_empty());
    }

    #[test]
    fn test_values_follow_schema_order() {
        let row = align(
            &raw(json!({"hour_of_day": 14, "Category": "Execution", "alert_burst_count": 50})),
            &schema(),
        );
        assert_eq!(row.values().get(0), Some(&AlignedValue::Numeric(50.0)));
        assert_eq!(row.values().get(1), Some(&AlignedValue::Categorical("Execution".to_string())));
        assert_eq!(row.values().get(2), Some(&AlignedValue::Numeric(14.0)));
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let row = align(&raw(json!({"alert_burst_count": "42"})), &schema());
        assert_eq!(row.values().get(0), Some(&AlignedValue::Numeric(42.0)));
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let base = raw(json!({"alert_burst_count": 7, "Category": "Execution"}));
        let mut extra = base.clone();
        extra.insert("not_a_feature".to_string(), json!("whatever"));

        assert_eq!(align(&base, &schema()), align(&extra, &schema()));
    }

    #[test]
    fn test_malformed_values_never_abort_row() {
        let row = align(
            &raw(json!({
                "alert_burst_count": null,
                "Category": {"nested": [1, 2]},
                "hour_of_day": "NaN"
            })),
            &schema(),
        );
        assert_eq!(row.len(), 3);
        assert!(row.values()[0].is_missing());
        assert_eq!(
            row.values().get(1),
            Some(&AlignedValue::Categorical(r#"{"nested":[1,2]}"#.to_string()))
        );
        assert!(row.values()[2].is_missing());
    }

    #[test]
    fn test_booleans_are_numeric() {
        let row = align(&raw(json!({"hour_of_day": true})), &schema());
        assert_eq!(row.values().get(2), Some(&AlignedValue::Numeric(1.0)));
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let input = raw(json!({"alert_burst_count": "12", "Category": ["a", "b"], "x": 1}));
        let s = schema();
        let first = align(&input, &s);
        let second = align(&input, &s);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_encode_maps_categories_and_missing() {
        let row = align(
            &raw(json!({"alert_burst_count": 3, "Category": "InitialAccess"})),
            &schema(),
        );
        let encoded = row.encode(&schema());
        assert_eq!(encoded[0], 3.0);
        assert_eq!(encoded[1], 1.0);
        assert!(encoded[2].is_nan());

        let unknown = align(&raw(json!({"Category": "Discovery"})), &schema()).encode(&schema());
        assert!(unknown[1].is_nan());
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&json!(12)), Some(12.0));
        assert_eq!(coerce_numeric(&json!(" 7.5 ")), Some(7.5));
        assert_eq!(coerce_numeric(&json!(false)), Some(0.0));
        assert_eq!(coerce_numeric(&json!("lots")), None);
        assert_eq!(coerce_numeric(&json!("inf")), None);
        assert_eq!(coerce_numeric(&json!([1])), None);
    }
}
