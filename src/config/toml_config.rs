use crate::core::classification::ClassificationConfig;
use crate::core::features::FeatureConfig;
use crate::core::validator::ValidationRules;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_allowed_values, validate_keywords, validate_non_empty_string, validate_path,
    validate_positive_number, validate_regex, validate_weight, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const SUPPORTED_OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Every section is optional in the file; an empty document yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub classification: ClassificationConfig,
    pub features: FeatureConfig,
    pub validation: ValidationRules,
    pub load: LoadConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "handset-etl".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub input_file: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input_file: "data_input/product-set.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub batch_size: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    /// Product outputs; the validation report is always written.
    pub output_formats: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "output".to_string(),
            output_formats: vec!["json".to_string(), "csv".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("source.input_file", &self.source.input_file)?;
        validate_path("source.input_file", &self.source.input_file)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_positive_number("extract.batch_size", self.extract.batch_size, 1)?;
        validate_allowed_values(
            "load.output_formats",
            &self.load.output_formats,
            &SUPPORTED_OUTPUT_FORMATS,
        )?;

        for (name, weight) in self.classification.weights.entries() {
            validate_weight(&format!("classification.weights.{}", name), weight)?;
        }
        validate_weight("classification.min_score", self.classification.min_score)?;
        validate_keywords(
            "classification.exclusion_keywords",
            &self.classification.exclusion_keywords,
        )?;
        validate_keywords(
            "classification.tariff_keywords",
            &self.classification.tariff_keywords,
        )?;
        validate_keywords(
            "classification.device_spec_keys",
            &self.classification.device_spec_keys,
        )?;

        validate_keywords("features.condition_keywords", &self.features.condition_keywords)?;
        validate_keywords("features.storage_keys", &self.features.storage_keys)?;

        validate_regex("validation.sku_pattern", &self.validation.sku_pattern)?;

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// Log filter directive from `[monitoring] log_level`, if set.
    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.log_level.as_deref()
    }
}

impl ConfigProvider for TomlConfig {
    fn input_file(&self) -> &str {
        &self.source.input_file
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn batch_size(&self) -> usize {
        self.extract.batch_size
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn classification(&self) -> &ClassificationConfig {
        &self.classification
    }

    fn features(&self) -> &FeatureConfig {
        &self.features
    }

    fn validation(&self) -> &ValidationRules {
        &self.validation
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
