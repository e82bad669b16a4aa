//! Weighted multi-signal category classification.
//!
//! Each [`Signal`] is an entry of an ordered table: what it looks at, which
//! category it votes for and with what weight. Classification sums the weights
//! of the signals that fire, per category, and picks the highest score. Ties go
//! to the most specific category (see [`Category::PRIORITY`]). A winner below
//! the configured threshold falls back to [`Category::Device`] so unseen
//! products are still classified.
//!
//! Exclusion keywords short-circuit everything: a record mentioning
//! "insurance" is excluded no matter what else it carries.

use crate::domain::model::{Category, RawRecord};
use crate::utils::text::TextIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DeviceOptions,
    DeviceSpecs,
    BrandPrior,
    TariffFields,
    TariffKeywords,
    DeviceKeywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub device_options: f64,
    pub device_specs: f64,
    pub brand_prior: f64,
    pub tariff_fields: f64,
    pub tariff_keywords: f64,
    pub device_keywords: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            device_options: 3.0,
            device_specs: 2.0,
            brand_prior: 1.0,
            tariff_fields: 3.0,
            tariff_keywords: 1.5,
            device_keywords: 1.0,
        }
    }
}

impl SignalWeights {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::DeviceOptions => self.device_options,
            SignalKind::DeviceSpecs => self.device_specs,
            SignalKind::BrandPrior => self.brand_prior,
            SignalKind::TariffFields => self.tariff_fields,
            SignalKind::TariffKeywords => self.tariff_keywords,
            SignalKind::DeviceKeywords => self.device_keywords,
        }
    }

    /// `(config key, weight)` pairs, for validation and logging.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("device_options", self.device_options),
            ("device_specs", self.device_specs),
            ("brand_prior", self.brand_prior),
            ("tariff_fields", self.tariff_fields),
            ("tariff_keywords", self.tariff_keywords),
            ("device_keywords", self.device_keywords),
        ]
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub weights: SignalWeights,
    pub min_score: f64,
    pub exclusion_keywords: Vec<String>,
    /// Weak prior only. A brand missing from this list is still classified.
    pub brand_priors: Vec<String>,
    pub device_spec_keys: Vec<String>,
    pub tariff_keywords: Vec<String>,
    pub device_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            min_score: 1.0,
            exclusion_keywords: strings(&[
                "insurance",
                "accessories",
                "accessory",
                "simo",
                "sim only",
                "protection",
                "case",
                "charger",
                "cable",
                "warranty",
                "adapter",
            ]),
            brand_priors: strings(&[
                "apple", "samsung", "google", "motorola", "nokia", "sony", "xiaomi", "oneplus",
                "oppo", "honor", "huawei", "iphone", "galaxy", "pixel", "moto",
            ]),
            device_spec_keys: strings(&[
                "display",
                "screen",
                "camera",
                "battery",
                "processor",
                "chipset",
                "operating system",
            ]),
            tariff_keywords: strings(&["tariff", "pay monthly", "plan", "airtime"]),
            device_keywords: strings(&[
                "tablet",
                "smartwatch",
                "watch",
                "laptop",
                "router",
                "hotspot",
                "dongle",
                "mobile broadband",
            ]),
        }
    }
}

/// Text views of a record, tokenized once per classification.
struct RecordText {
    /// brand, name
    identity: TextIndex,
    /// name, code, productType, tags
    descriptor: TextIndex,
    /// specification group and entry names
    spec_names: TextIndex,
}

impl RecordText {
    fn new(record: &RawRecord) -> Self {
        let mut descriptor: Vec<&str> = [record.name_text(), record.code.as_deref(), record.product_type.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        descriptor.extend(record.tags.iter().map(String::as_str));

        let spec_names = record.specification_groups.iter().flat_map(|group| {
            group
                .name
                .as_deref()
                .into_iter()
                .chain(group.specifications.iter().filter_map(|spec| spec.name.as_deref()))
        });

        Self {
            identity: TextIndex::new(record.brand_text().into_iter().chain(record.name_text())),
            descriptor: TextIndex::new(descriptor),
            spec_names: TextIndex::new(spec_names),
        }
    }
}

type Predicate = fn(&RawRecord, &RecordText, &ClassificationConfig) -> Option<String>;

/// One row of the signal table.
#[derive(Clone)]
pub struct Signal {
    pub kind: SignalKind,
    pub category: Category,
    pub weight: f64,
    predicate: Predicate,
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("weight", &self.weight)
            .finish()
    }
}

impl Signal {
    /// The signal table in evaluation order.
    pub fn table(weights: &SignalWeights) -> Vec<Signal> {
        let rows: [(SignalKind, Category, Predicate); 6] = [
            (SignalKind::DeviceOptions, Category::Handset, has_device_options),
            (SignalKind::DeviceSpecs, Category::Handset, has_device_specs),
            (SignalKind::BrandPrior, Category::Handset, matches_brand_prior),
            (SignalKind::TariffFields, Category::Tariff, has_tariff_fields),
            (SignalKind::TariffKeywords, Category::Tariff, matches_tariff_keyword),
            (SignalKind::DeviceKeywords, Category::Device, matches_device_keyword),
        ];
        rows.into_iter()
            .map(|(kind, category, predicate)| Signal {
                kind,
                category,
                weight: weights.get(kind),
                predicate,
            })
            .collect()
    }

    /// Evidence string when the signal fires on `record`, `None` otherwise.
    pub fn evaluate(&self, record: &RawRecord, config: &ClassificationConfig) -> Option<String> {
        (self.predicate)(record, &RecordText::new(record), config)
    }

    fn evaluate_with(&self, record: &RawRecord, text: &RecordText, config: &ClassificationConfig) -> Option<String> {
        (self.predicate)(record, text, config)
    }
}

fn has_device_options(record: &RawRecord, _: &RecordText, _: &ClassificationConfig) -> Option<String> {
    let count = record.device_options.len();
    (count > 0).then(|| format!("{} device option(s)", count))
}

fn has_device_specs(_: &RawRecord, text: &RecordText, config: &ClassificationConfig) -> Option<String> {
    text.spec_names
        .first_match(&config.device_spec_keys)
        .map(|key| format!("spec key '{}'", key))
}

fn matches_brand_prior(_: &RawRecord, text: &RecordText, config: &ClassificationConfig) -> Option<String> {
    text.identity
        .first_match(&config.brand_priors)
        .map(|prior| format!("brand prior '{}'", prior))
}

fn has_tariff_fields(record: &RawRecord, _: &RecordText, _: &ClassificationConfig) -> Option<String> {
    let present: Vec<&str> = [
        ("monthlyPrice", &record.monthly_price),
        ("dataAllowance", &record.data_allowance),
        ("contractLength", &record.contract_length),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_some())
    .map(|(key, _)| key)
    .collect();
    (!present.is_empty()).then(|| format!("tariff fields {}", present.join(", ")))
}

fn matches_tariff_keyword(_: &RawRecord, text: &RecordText, config: &ClassificationConfig) -> Option<String> {
    text.descriptor
        .first_match(&config.tariff_keywords)
        .map(|keyword| format!("tariff keyword '{}'", keyword))
}

fn matches_device_keyword(_: &RawRecord, text: &RecordText, config: &ClassificationConfig) -> Option<String> {
    text.descriptor
        .first_match(&config.device_keywords)
        .map(|keyword| format!("device keyword '{}'", keyword))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalHit {
    pub signal: SignalKind,
    pub category: Category,
    pub weight: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Included(Category),
    Excluded { keyword: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Per-category totals in [`Category::PRIORITY`] order. Empty when excluded.
    pub scores: Vec<(Category, f64)>,
    pub trace: Vec<SignalHit>,
    /// The winning score was below `min_score`, so the record went to the catch-all.
    pub fell_back: bool,
    /// Two or more categories shared the top non-zero score.
    pub ambiguous: bool,
}

impl Classification {
    pub fn category(&self) -> Option<Category> {
        match self.verdict {
            Verdict::Included(category) => Some(category),
            Verdict::Excluded { .. } => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self.verdict, Verdict::Excluded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    config: ClassificationConfig,
    signals: Vec<Signal>,
}

impl ClassificationEngine {
    pub fn new(config: ClassificationConfig) -> Self {
        let signals = Signal::table(&config.weights);
        Self { config, signals }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    pub fn classify(&self, record: &RawRecord) -> Classification {
        let text = RecordText::new(record);

        if let Some(keyword) = text.descriptor.first_match(&self.config.exclusion_keywords) {
            return Classification {
                verdict: Verdict::Excluded {
                    keyword: keyword.to_string(),
                },
                scores: Vec::new(),
                trace: Vec::new(),
                fell_back: false,
                ambiguous: false,
            };
        }

        let trace: Vec<SignalHit> = self
            .signals
            .iter()
            .filter_map(|signal| {
                signal
                    .evaluate_with(record, &text, &self.config)
                    .map(|evidence| SignalHit {
                        signal: signal.kind,
                        category: signal.category,
                        weight: signal.weight,
                        evidence,
                    })
            })
            .collect();

        let scores: Vec<(Category, f64)> = Category::PRIORITY
            .iter()
            .map(|&category| {
                let total = trace
                    .iter()
                    .filter(|hit| hit.category == category)
                    .map(|hit| hit.weight)
                    .sum();
                (category, total)
            })
            .collect();

        // Strictly-greater keeps the earlier (more specific) category on ties.
        let (mut winner, mut best) = scores[0];
        for &(category, score) in &scores[1..] {
            if score > best {
                winner = category;
                best = score;
            }
        }

        let ambiguous = best > 0.0 && scores.iter().filter(|(_, score)| *score == best).count() > 1;
        let fell_back = best <= 0.0 || best < self.config.min_score;
        let category = if fell_back { Category::Device } else { winner };

        Classification {
            verdict: Verdict::Included(category),
            scores,
            trace,
            fell_back,
            ambiguous,
        }
    }
}
