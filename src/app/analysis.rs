//! Field-hierarchy survey of a JSON feed, used to inspect unfamiliar catalogues.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SUMMARY_FILE: &str = "json_analysis_summary.json";

pub fn json_type(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) if n.is_f64() => "float".to_string(),
        Value::Number(_) => "integer".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => match items.first() {
            None => "array[empty]".to_string(),
            Some(Value::Object(_)) => "array[object]".to_string(),
            Some(first) => format!("array[{}]", json_type(first)),
        },
        Value::Object(_) => "object".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct FieldTally {
    count: usize,
    /// First-seen order.
    types: Vec<String>,
}

impl FieldTally {
    fn observe(&mut self, value: &Value) {
        self.count += 1;
        let kind = json_type(value);
        if !self.types.contains(&kind) {
            self.types.push(kind);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub count: usize,
    pub percentage: f64,
    pub types: Vec<String>,
    pub present_in_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureSummary {
    pub total_items: usize,
    pub field_analysis: BTreeMap<String, FieldSummary>,
}

impl StructureSummary {
    pub fn is_nested(path: &str) -> bool {
        path.contains('.') || path.contains('[')
    }

    pub fn top_level(&self) -> impl Iterator<Item = (&String, &FieldSummary)> {
        self.field_analysis.iter().filter(|(path, _)| !Self::is_nested(path))
    }

    pub fn nested(&self) -> impl Iterator<Item = (&String, &FieldSummary)> {
        self.field_analysis.iter().filter(|(path, _)| Self::is_nested(path))
    }
}

/// Top-level fields, `obj.field` one level into objects, and `arr[].field`
/// from the first element of object arrays. A non-array document counts as one item.
pub fn analyze(document: &Value) -> StructureSummary {
    let items: Vec<&Value> = match document {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut tallies: BTreeMap<String, FieldTally> = BTreeMap::new();
    let mut observe = |path: String, value: &Value| tallies.entry(path).or_default().observe(value);

    for object in items.iter().filter_map(|item| item.as_object()) {
        for (field, value) in object {
            observe(field.clone(), value);

            let nested: Option<(&Map<String, Value>, String)> = match value {
                Value::Object(inner) => Some((inner, format!("{}.", field))),
                Value::Array(elements) => elements
                    .first()
                    .and_then(Value::as_object)
                    .map(|inner| (inner, format!("{}[].", field))),
                _ => None,
            };
            if let Some((inner, prefix)) = nested {
                for (nested_field, nested_value) in inner {
                    observe(format!("{}{}", prefix, nested_field), nested_value);
                }
            }
        }
    }

    let total_items = items.len();
    let field_analysis = tallies
        .into_iter()
        .map(|(path, tally)| {
            let percentage = if total_items == 0 {
                0.0
            } else {
                (tally.count as f64 / total_items as f64 * 10_000.0).round() / 100.0
            };
            let summary = FieldSummary {
                count: tally.count,
                percentage,
                types: tally.types,
                present_in_all: tally.count == total_items,
            };
            (path, summary)
        })
        .collect();

    StructureSummary {
        total_items,
        field_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_types() {
        assert_eq!(json_type(&json!(null)), "null");
        assert_eq!(json_type(&json!(1)), "integer");
        assert_eq!(json_type(&json!(1.5)), "float");
        assert_eq!(json_type(&json!([])), "array[empty]");
        assert_eq!(json_type(&json!([{"a": 1}])), "array[object]");
        assert_eq!(json_type(&json!(["x"])), "array[string]");
        assert_eq!(json_type(&json!([[1]])), "array[array[integer]]");
    }

    #[test]
    fn test_analyze_hierarchy() {
        let summary = analyze(&json!([
            {"id": "1", "brand": "Apple", "price": {"monthly": 30.5}, "deviceOptions": [{"color": {"name": "Blue"}}]},
            {"id": 2, "price": null, "deviceOptions": []}
        ]));

        assert_eq!(summary.total_items, 2);

        let id = &summary.field_analysis["id"];
        assert_eq!(id.count, 2);
        assert_eq!(id.types, vec!["string", "integer"]);
        assert!(id.present_in_all);

        let brand = &summary.field_analysis["brand"];
        assert_eq!(brand.percentage, 50.0);
        assert!(!brand.present_in_all);

        assert_eq!(summary.field_analysis["price.monthly"].types, vec!["float"]);
        assert_eq!(summary.field_analysis["deviceOptions[].color"].count, 1);
        assert_eq!(
            summary.field_analysis["deviceOptions"].types,
            vec!["array[object]", "array[empty]"]
        );

        assert_eq!(summary.top_level().count(), 4);
        assert_eq!(summary.nested().count(), 2);
    }

    #[test]
    fn test_single_object_and_rounding() {
        let summary = analyze(&json!({"a": 1}));
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.field_analysis["a"].percentage, 100.0);

        let thirds = analyze(&json!([{"a": 1}, {}, {}]));
        assert_eq!(thirds.field_analysis["a"].percentage, 33.33);
    }
}
