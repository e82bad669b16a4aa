//! Two-tier record validation.
//!
//! Tier 1 (structural) checks that `id`, `brand` and `name` exist with the
//! right primitive types. Tier 2 (business) runs on structurally sound,
//! non-excluded records and checks SKU format, rating range and facet
//! consistency. Either tier yields one [`ValidationError`] for the first rule
//! that fails.

use crate::core::features::Facets;
use crate::domain::model::{Category, RawRecord, TransformedProduct, ValidationError};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 5.0;

static STORAGE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)?(?:GB|TB)$").expect("storage entry pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub sku_pattern: String,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            sku_pattern: r"^[A-Za-z0-9][A-Za-z0-9_\-./]*$".to_string(),
        }
    }
}

/// Tier-1 output: the identity fields, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralFields {
    pub id: String,
    pub brand: String,
    pub name: String,
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_text(
    record_id: &str,
    field: &str,
    value: Option<&Value>,
) -> std::result::Result<String, ValidationError> {
    match value {
        None => Err(ValidationError::structural(record_id, field, format!("{} is required", field))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::structural(
            record_id,
            field,
            format!("{} must not be empty", field),
        )),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(ValidationError::structural(
            record_id,
            field,
            format!("{} must be a string, got {}", field, json_type(other)),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    rules: ValidationRules,
    sku_regex: Regex,
}

impl Validator {
    pub fn new(rules: ValidationRules) -> Result<Self> {
        let sku_regex = Regex::new(&rules.sku_pattern).map_err(|e| EtlError::InvalidConfigValueError {
            field: "validation.sku_pattern".to_string(),
            value: rules.sku_pattern.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { rules, sku_regex })
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Tier 1.
    pub fn validate_structure(
        &self,
        record: &RawRecord,
    ) -> std::result::Result<StructuralFields, ValidationError> {
        let record_id = record.identifier();

        let id = match record.id.as_ref() {
            None => return Err(ValidationError::structural(&record_id, "id", "id is required")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ValidationError::structural(&record_id, "id", "id must not be empty"))
            }
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) if !n.is_f64() => n.to_string(),
            Some(other) => {
                return Err(ValidationError::structural(
                    &record_id,
                    "id",
                    format!("id must be a string or integer, got {}", json_type(other)),
                ))
            }
        };

        let brand = required_text(&record_id, "brand", record.brand.as_ref())?;
        let name = required_text(&record_id, "name", record.name.as_ref())?;

        Ok(StructuralFields { id, brand, name })
    }

    /// Both tiers; on success the clean product.
    pub fn validate(
        &self,
        record: &RawRecord,
        category: Category,
        facets: Facets,
        processed_at: DateTime<Utc>,
    ) -> std::result::Result<TransformedProduct, ValidationError> {
        let fields = self.validate_structure(record)?;
        let record_id = fields.id.clone();

        let sku = resolve_sku(record, &fields);
        if !self.sku_regex.is_match(&sku) {
            return Err(ValidationError::business(
                &record_id,
                "sku",
                format!("sku '{}' does not match pattern {}", sku, self.rules.sku_pattern),
            ));
        }

        let rating = validate_rating(&record_id, record.average_rating.as_ref())?;
        let review_count = validate_review_count(&record_id, record.total_reviews.as_ref())?;

        if let Some(duplicate) = first_duplicate(&facets.storage_options, |s| s.trim().to_uppercase()) {
            return Err(ValidationError::business(
                &record_id,
                "storage_options",
                format!("duplicate storage option '{}'", duplicate),
            ));
        }
        if let Some(duplicate) = first_duplicate(&facets.color_options, |s| s.trim().to_lowercase()) {
            return Err(ValidationError::business(
                &record_id,
                "color_options",
                format!("duplicate color option '{}'", duplicate),
            ));
        }
        if let Some(bad) = facets.storage_options.iter().find(|s| !STORAGE_ENTRY.is_match(s)) {
            return Err(ValidationError::business(
                &record_id,
                "storage_options",
                format!("storage option '{}' is not of the form <number><GB|TB>", bad),
            ));
        }

        Ok(TransformedProduct {
            product_id: fields.id,
            brand: fields.brand,
            name: fields.name,
            category,
            sku,
            in_stock: record.in_stock.unwrap_or(false),
            storage_options: facets.storage_options,
            color_options: facets.color_options,
            network_technology: facets.network_technology,
            condition: facets.condition,
            rating,
            review_count,
            processed_timestamp: processed_at,
        })
    }
}

/// `skuCode`, then `code`, then `<brand>_<id>` with whitespace collapsed to `_`.
pub fn resolve_sku(record: &RawRecord, fields: &StructuralFields) -> String {
    [record.sku_code.as_deref(), record.code.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("{}_{}", fields.brand, fields.id)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("_")
        })
}

fn validate_rating(
    record_id: &str,
    value: Option<&Value>,
) -> std::result::Result<Option<f64>, ValidationError> {
    let rating = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match rating {
        Some(r) if (RATING_MIN..=RATING_MAX).contains(&r) => Ok(Some(r)),
        Some(r) => Err(ValidationError::business(
            record_id,
            "rating",
            format!("rating {} is outside [{}, {}]", r, RATING_MIN, RATING_MAX),
        )),
        None => Err(ValidationError::business(record_id, "rating", "rating must be numeric")),
    }
}

fn validate_review_count(
    record_id: &str,
    value: Option<&Value>,
) -> std::result::Result<Option<u64>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64()),
        Some(other) => Err(ValidationError::business(
            record_id,
            "review_count",
            format!("review_count must be a non-negative integer, got {}", other),
        )),
    }
}

fn first_duplicate<'a, F>(items: &'a [String], normalize: F) -> Option<&'a str>
where
    F: Fn(&str) -> String,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .find(|item| !seen.insert(normalize(item)))
        .map(String::as_str)
}
