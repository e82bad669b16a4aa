use crate::utils::error::{EtlError, Result};
use regex::Regex;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Weights and thresholds must be finite and non-negative.
pub fn validate_weight(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number >= 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_keywords(field_name: &str, keywords: &[String]) -> Result<()> {
    if keywords.is_empty() {
        return Err(EtlError::ConfigValidationError {
            field: field_name.to_string(),
            message: "Keyword list cannot be empty".to_string(),
        });
    }
    for keyword in keywords {
        validate_non_empty_string(field_name, keyword)?;
    }
    Ok(())
}

pub fn validate_regex(field_name: &str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: pattern.to_string(),
            reason: format!("Invalid regular expression: {}", e),
        })
}

pub fn validate_allowed_values(field_name: &str, values: &[String], allowed: &[&str]) -> Result<()> {
    for value in values {
        if !allowed.contains(&value.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.clone(),
                reason: format!("Unsupported value. Allowed values: {}", allowed.join(", ")),
            });
        }
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("extract.batch_size", 5, 1).is_ok());
        assert!(validate_positive_number("extract.batch_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight("classification.weights.brand_prior", 0.0).is_ok());
        assert!(validate_weight("classification.weights.brand_prior", 2.5).is_ok());
        assert!(validate_weight("classification.weights.brand_prior", -1.0).is_err());
        assert!(validate_weight("classification.weights.brand_prior", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_keywords() {
        assert!(validate_keywords("k", &["insurance".to_string()]).is_ok());
        assert!(validate_keywords("k", &[]).is_err());
        assert!(validate_keywords("k", &["  ".to_string()]).is_err());
    }

    #[test]
    fn test_validate_regex() {
        assert!(validate_regex("validation.sku_pattern", r"^[A-Z]+$").is_ok());
        assert!(validate_regex("validation.sku_pattern", r"^[A-Z").is_err());
    }

    #[test]
    fn test_validate_allowed_values() {
        let formats = vec!["json".to_string(), "csv".to_string()];
        assert!(validate_allowed_values("load.output_formats", &formats, &["json", "csv"]).is_ok());
        let bad = vec!["xml".to_string()];
        assert!(validate_allowed_values("load.output_formats", &bad, &["json", "csv"]).is_err());
    }
}
