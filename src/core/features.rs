//! Facet extraction from the nested option and specification structures.
//!
//! Nothing here fails: a record without options or specs simply yields empty
//! lists and absent values.

use crate::domain::model::RawRecord;
use crate::utils::text::TextIndex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static STORAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s?(GB|TB)\b").expect("storage token pattern is valid")
});

static NETWORK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:([2-5])G|(LTE))\b").expect("network token pattern is valid")
});

const GB_PER_TB: f64 = 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Priority order; the first keyword found wins. Put compound phrases
    /// ("Like New") ahead of the words they contain ("New").
    pub condition_keywords: Vec<String>,
    /// Specification entries whose group or entry name contains one of these are scanned for storage.
    pub storage_keys: Vec<String>,
    /// Specification entries whose name contains one of these are scanned for condition.
    pub condition_spec_keys: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            condition_keywords: ["Like New", "Refurbished", "Used", "New"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            storage_keys: vec!["storage".to_string(), "capacity".to_string()],
            condition_spec_keys: vec!["condition".to_string(), "grade".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub storage_options: Vec<String>,
    pub color_options: Vec<String>,
    pub network_technology: Option<String>,
    pub condition: Option<String>,
}

/// A storage token parsed into display form and comparable capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCapacity {
    pub display: String,
    pub gigabytes: f64,
}

impl StorageCapacity {
    /// Parses a single `<number><GB|TB>` token such as `"256gb"` or `"1 TB"`.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = STORAGE_TOKEN.captures(token.trim())?;
        Self::from_parts(&caps[1], &caps[2])
    }

    fn from_parts(number: &str, unit: &str) -> Option<Self> {
        let value: f64 = number.parse().ok()?;
        if value <= 0.0 || !value.is_finite() {
            return None;
        }
        let unit = unit.to_uppercase();
        let gigabytes = if unit == "TB" { value * GB_PER_TB } else { value };
        Some(Self {
            display: format!("{}{}", value, unit),
            gigabytes,
        })
    }
}

/// Every storage token in `texts`, normalized, deduplicated and sorted by capacity.
pub fn normalize_storage<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut capacities: Vec<StorageCapacity> = texts
        .into_iter()
        .flat_map(|text| {
            STORAGE_TOKEN
                .captures_iter(text)
                .filter_map(|caps| StorageCapacity::from_parts(&caps[1], &caps[2]))
                .collect::<Vec<_>>()
        })
        .filter(|capacity| seen.insert(capacity.display.clone()))
        .collect();

    capacities.sort_by(|a, b| {
        a.gigabytes
            .total_cmp(&b.gigabytes)
            .then_with(|| a.display.cmp(&b.display))
    });
    capacities.into_iter().map(|capacity| capacity.display).collect()
}

/// Trimmed, case-insensitively deduplicated, first-seen order and spelling.
pub fn dedupe_colors<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Highest generation among the network tokens in `texts` (5G > 4G > 3G > 2G).
pub fn strongest_network<'a, I>(texts: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .flat_map(|text| {
            NETWORK_TOKEN
                .captures_iter(text)
                .filter_map(|caps| match (caps.get(1), caps.get(2)) {
                    (Some(generation), _) => generation.as_str().parse::<u8>().ok(),
                    (None, Some(_)) => Some(4),
                    (None, None) => None,
                })
                .collect::<Vec<_>>()
        })
        .max()
        .map(|generation| format!("{}G", generation))
}

fn name_matches(name: Option<&str>, keys: &[String]) -> bool {
    let Some(name) = name else {
        return false;
    };
    let name = name.to_lowercase();
    keys.iter().any(|key| name.contains(&key.to_lowercase()))
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, record: &RawRecord) -> Facets {
        Facets {
            storage_options: self.storage_options(record),
            color_options: self.color_options(record),
            network_technology: self.network_technology(record),
            condition: self.condition(record),
        }
    }

    pub fn storage_options(&self, record: &RawRecord) -> Vec<String> {
        let option_texts = record
            .device_options
            .iter()
            .flat_map(|option| option.capacity_values.iter())
            .filter_map(|capacity| capacity.name.as_deref());

        let spec_texts = record.specification_groups.iter().flat_map(|group| {
            let group_matches = name_matches(group.name.as_deref(), &self.config.storage_keys);
            group
                .specifications
                .iter()
                .filter(move |spec| {
                    group_matches || name_matches(spec.name.as_deref(), &self.config.storage_keys)
                })
                .filter_map(|spec| spec.value.as_deref())
        });

        normalize_storage(option_texts.chain(spec_texts))
    }

    pub fn color_options(&self, record: &RawRecord) -> Vec<String> {
        dedupe_colors(
            record
                .device_options
                .iter()
                .filter_map(|option| option.color.as_ref())
                .filter_map(|color| color.name.as_deref()),
        )
    }

    pub fn network_technology(&self, record: &RawRecord) -> Option<String> {
        let spec_texts = record
            .specification_groups
            .iter()
            .flat_map(|group| group.specifications.iter())
            .flat_map(|spec| spec.name.as_deref().into_iter().chain(spec.value.as_deref()));

        strongest_network(spec_texts.chain(record.name_text()))
    }

    pub fn condition(&self, record: &RawRecord) -> Option<String> {
        let keywords = &self.config.condition_keywords;

        if let Some(state) = record.device_state.as_deref() {
            let state = state.trim();
            if let Some(exact) = keywords.iter().find(|keyword| keyword.eq_ignore_ascii_case(state)) {
                return Some(exact.clone());
            }
        }

        let condition_specs = record
            .specification_groups
            .iter()
            .flat_map(|group| group.specifications.iter())
            .filter(|spec| name_matches(spec.name.as_deref(), &self.config.condition_spec_keys))
            .filter_map(|spec| spec.value.as_deref());

        let index = TextIndex::new(
            record
                .device_state
                .as_deref()
                .into_iter()
                .chain(record.name_text())
                .chain(condition_specs),
        );
        index.first_match(keywords).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_storage_sorted_by_capacity_not_text() {
        assert_eq!(
            normalize_storage(["256GB", "1TB", "128GB"]),
            vec!["128GB", "256GB", "1TB"]
        );
    }

    #[test]
    fn test_storage_normalizes_unit_casing_and_dedupes() {
        assert_eq!(
            normalize_storage(["64gb", "64GB", "2 tb", "512 GB"]),
            vec!["64GB", "512GB", "2TB"]
        );
    }

    #[test]
    fn test_storage_finds_tokens_inside_text() {
        assert_eq!(
            normalize_storage(["Internal storage 128GB / 256GB", "no capacity here"]),
            vec!["128GB", "256GB"]
        );
        assert!(normalize_storage(["0GB"]).is_empty());
    }

    #[test]
    fn test_storage_capacity_parse() {
        let tb = StorageCapacity::parse("1.5tb").unwrap();
        assert_eq!(tb.display, "1.5TB");
        assert_eq!(tb.gigabytes, 1536.0);
        assert!(StorageCapacity::parse("8 cores").is_none());
    }

    #[test]
    fn test_colors_first_seen_order() {
        assert_eq!(
            dedupe_colors(["Midnight", " Starlight", "midnight", "Blue", ""]),
            vec!["Midnight", "Starlight", "Blue"]
        );
    }

    #[test]
    fn test_network_precedence() {
        assert_eq!(strongest_network(["3G", "4G LTE", "5G"]), Some("5G".to_string()));
        assert_eq!(strongest_network(["LTE Advanced"]), Some("4G".to_string()));
        assert_eq!(strongest_network(["3G only"]), Some("3G".to_string()));
        assert_eq!(strongest_network(["64GB"]), None);
    }

    #[test]
    fn test_extract_full_record() {
        let phone = record(json!({
            "name": "iPhone 16 Pro Max",
            "deviceState": "New",
            "deviceOptions": [
                {"color": {"name": "Desert Titanium"}, "capacityValues": [{"name": "512GB"}, {"name": "256GB"}]},
                {"color": {"name": "Black Titanium"}, "capacityValues": [{"name": "1TB"}, {"name": "256GB"}]}
            ],
            "specificationGroups": [
                {"name": "Network", "specifications": [{"name": "Network Technology", "value": "5G"}]},
                {"name": "Memory", "specifications": [{"name": "RAM", "value": "8GB"}]}
            ]
        }));

        let facets = FeatureExtractor::default().extract(&phone);
        assert_eq!(facets.storage_options, vec!["256GB", "512GB", "1TB"]);
        assert_eq!(facets.color_options, vec!["Desert Titanium", "Black Titanium"]);
        assert_eq!(facets.network_technology.as_deref(), Some("5G"));
        assert_eq!(facets.condition.as_deref(), Some("New"));
    }

    #[test]
    fn test_storage_from_storage_spec_group() {
        let phone = record(json!({
            "specificationGroups": [
                {"name": "Storage", "specifications": [{"name": "Internal", "value": "128GB"}]},
                {"name": "Hardware", "specifications": [{"name": "Storage capacity", "value": "64 GB"}]}
            ]
        }));
        assert_eq!(
            FeatureExtractor::default().storage_options(&phone),
            vec!["64GB", "128GB"]
        );
    }

    #[test]
    fn test_condition_priority_and_exact_state() {
        let extractor = FeatureExtractor::default();

        let exact = record(json!({"deviceState": "like new"}));
        assert_eq!(extractor.condition(&exact).as_deref(), Some("Like New"));

        let from_name = record(json!({"name": "Galaxy S21 Refurbished - Like New"}));
        assert_eq!(extractor.condition(&from_name).as_deref(), Some("Like New"));

        let from_spec = record(json!({
            "specificationGroups": [{"specifications": [{"name": "Grade", "value": "Used - good"}]}]
        }));
        assert_eq!(extractor.condition(&from_spec).as_deref(), Some("Used"));
    }

    #[test]
    fn test_missing_sections_yield_empty_facets() {
        let bare = record(json!({"id": "x"}));
        assert_eq!(FeatureExtractor::default().extract(&bare), Facets::default());
    }
}
