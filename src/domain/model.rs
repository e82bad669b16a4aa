use crate::utils::error::EtlError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Output category. Excluded records never become products, so there is no
/// excluded variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Handset,
    Tariff,
    Device,
}

impl Category {
    /// Tie-break order, most specific first.
    pub const PRIORITY: [Category; 3] = [Category::Handset, Category::Tariff, Category::Device];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Handset => "handset",
            Category::Tariff => "tariff",
            Category::Device => "device",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feed item. Known fields are typed, everything else lands in `extra`.
///
/// `id`, `brand` and `name` stay untyped so structural validation can report
/// wrong primitive types instead of failing the whole decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRecord {
    pub id: Option<Value>,
    pub brand: Option<Value>,
    pub name: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sku_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub device_state: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub product_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub in_stock: Option<bool>,
    pub average_rating: Option<Value>,
    pub total_reviews: Option<Value>,
    #[serde(deserialize_with = "lenient::vec")]
    pub device_options: Vec<DeviceOption>,
    #[serde(deserialize_with = "lenient::vec")]
    pub specification_groups: Vec<SpecificationGroup>,
    #[serde(deserialize_with = "lenient::strings")]
    pub tags: Vec<String>,
    pub monthly_price: Option<Value>,
    pub data_allowance: Option<Value>,
    pub contract_length: Option<Value>,
    pub upfront_price: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceOption {
    #[serde(deserialize_with = "lenient::opt")]
    pub color: Option<ColorValue>,
    #[serde(deserialize_with = "lenient::vec")]
    pub capacity_values: Vec<CapacityValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorValue {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub hex_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapacityValue {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub device_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecificationGroup {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::vec")]
    pub specifications: Vec<Specification>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Specification {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
}

impl RawRecord {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Identifier used in error entries; `"unknown"` when the id is unusable.
    pub fn identifier(&self) -> String {
        identifier_of(self.id.as_ref())
    }

    pub fn name_text(&self) -> Option<&str> {
        self.name.as_ref().and_then(Value::as_str)
    }

    pub fn brand_text(&self) -> Option<&str> {
        self.brand.as_ref().and_then(Value::as_str)
    }

    pub fn has_tariff_fields(&self) -> bool {
        [&self.monthly_price, &self.data_allowance, &self.contract_length]
            .iter()
            .any(|field| field.is_some())
    }
}

/// Best-effort identifier of an item, also usable on values that failed to decode.
pub fn identifier_of(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedProduct {
    pub product_id: String,
    pub brand: String,
    pub name: String,
    pub category: Category,
    pub sku: String,
    pub in_stock: bool,
    pub storage_options: Vec<String>,
    pub color_options: Vec<String>,
    pub network_technology: Option<String>,
    pub condition: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    #[serde(with = "canonical_timestamp")]
    pub processed_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    Structural,
    Business,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::Structural => f.write_str("structural"),
            ValidationErrorKind::Business => f.write_str("business"),
        }
    }
}

/// Per-record failure. These are data carried in the report, never run-level errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} validation failed for record '{record_id}', field '{field}': {message}")]
pub struct ValidationError {
    pub record_id: String,
    pub field: String,
    pub message: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn structural(record_id: impl Into<String>, field: &str, message: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            field: field.to_string(),
            message: message.into(),
            kind: ValidationErrorKind::Structural,
        }
    }

    pub fn business(record_id: impl Into<String>, field: &str, message: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            field: field.to_string(),
            message: message.into(),
            kind: ValidationErrorKind::Business,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub filtered_records: usize,
    /// Percentage 0-100, one decimal.
    pub success_rate: f64,
    pub brands_processed: Vec<String>,
    pub categories_found: Vec<Category>,
    pub errors: Vec<ValidationError>,
    /// Seconds.
    pub processing_time: f64,
    pub batches_processed: usize,
    #[serde(with = "canonical_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub products: Vec<TransformedProduct>,
    pub report: ValidationReport,
}

/// A run stopped by a boundary failure; `partial` covers the batches consumed before it.
#[derive(Debug, thiserror::Error)]
#[error("transform aborted after {} records: {error}", .partial.report.total_records)]
pub struct RunFailure {
    pub error: EtlError,
    pub partial: TransformResult,
}

/// RFC 3339, UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod canonical_timestamp {
    use super::format_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Feed fields are loosely typed; these accept the common variants instead of
/// rejecting the whole record.
mod lenient {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
            _ => None,
        })
    }

    /// A nested object of the wrong shape is dropped.
    pub fn opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| T::deserialize(v).ok()))
    }

    /// Anything but an array becomes an empty list; elements that do not decode are skipped.
    pub fn vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| T::deserialize(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Scalars are stringified, nested values skipped.
    pub fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_raw_record_keeps_unknown_fields() {
        let record = RawRecord::from_value(json!({
            "id": "001",
            "brand": "Apple",
            "name": "iPhone 15",
            "image": "https://cdn/img.png",
            "promo": {"label": "Save 10"}
        }))
        .unwrap();

        assert_eq!(record.identifier(), "001");
        assert_eq!(record.brand_text(), Some("Apple"));
        assert!(record.extra.contains_key("image"));
        assert!(record.extra.contains_key("promo"));
    }

    #[test]
    fn test_raw_record_tolerates_loose_types() {
        let record = RawRecord::from_value(json!({
            "id": 42,
            "code": 1234,
            "inStock": "yes",
            "deviceOptions": null,
            "tags": null
        }))
        .unwrap();

        assert_eq!(record.identifier(), "42");
        assert_eq!(record.code.as_deref(), Some("1234"));
        assert_eq!(record.in_stock, Some(true));
        assert!(record.device_options.is_empty());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_nested_option_fields_tolerate_odd_types() {
        let record = RawRecord::from_value(json!({
            "id": "p1",
            "brand": "Apple",
            "name": "iPhone 15",
            "deviceOptions": [
                {
                    "color": {"name": "Blue", "hexCode": 255},
                    "capacityValues": [{"name": "128GB", "deviceCode": 123456, "isAvailable": "true"}, "256GB"]
                },
                {"color": "Black", "capacityValues": {"name": "512GB"}}
            ],
            "specificationGroups": "none",
            "tags": ["cover", 12, {"x": 1}, null]
        }))
        .unwrap();

        let first = &record.device_options[0];
        assert_eq!(first.color.as_ref().unwrap().hex_code.as_deref(), Some("255"));
        assert_eq!(first.capacity_values.len(), 1);
        assert_eq!(first.capacity_values[0].device_code.as_deref(), Some("123456"));
        assert_eq!(first.capacity_values[0].is_available, Some(true));

        let second = &record.device_options[1];
        assert!(second.color.is_none());
        assert!(second.capacity_values.is_empty());

        assert!(record.specification_groups.is_empty());
        assert_eq!(record.tags, vec!["cover", "12"]);
    }

    #[test]
    fn test_raw_record_rejects_non_object() {
        assert!(RawRecord::from_value(json!("just a string")).is_err());
        assert_eq!(identifier_of(None), "unknown");
    }

    #[test]
    fn test_tariff_fields_detection() {
        let tariff = RawRecord::from_value(json!({"dataAllowance": "100GB"})).unwrap();
        assert!(tariff.has_tariff_fields());
        let phone = RawRecord::from_value(json!({"name": "Pixel 8"})).unwrap();
        assert!(!phone.has_tariff_fields());
    }

    #[test]
    fn test_timestamp_is_canonical_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-01-31T12:00:00.000Z");
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Handset).unwrap(), "\"handset\"");
        assert_eq!(Category::Tariff.to_string(), "tariff");
    }
}
