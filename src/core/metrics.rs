use crate::domain::model::{
    Category, TransformResult, TransformedProduct, ValidationError, ValidationReport,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Instant;

/// What one batch produced. Built by the orchestrator, merged by the aggregator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub products: Vec<TransformedProduct>,
    pub errors: Vec<ValidationError>,
    pub filtered: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.products.len() + self.errors.len() + self.filtered
    }
}

/// Single-owner accumulator for one run.
#[derive(Debug)]
pub struct MetricsAggregator {
    started: Instant,
    timestamp: DateTime<Utc>,
    products: Vec<TransformedProduct>,
    errors: Vec<ValidationError>,
    filtered: usize,
    batches: usize,
    brands: BTreeSet<String>,
    categories: BTreeSet<Category>,
}

impl MetricsAggregator {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self::since(timestamp, Instant::now())
    }

    /// `processing_time` is measured from `started`.
    pub fn since(timestamp: DateTime<Utc>, started: Instant) -> Self {
        Self {
            started,
            timestamp,
            products: Vec::new(),
            errors: Vec::new(),
            filtered: 0,
            batches: 0,
            brands: BTreeSet::new(),
            categories: BTreeSet::new(),
        }
    }

    pub fn absorb(&mut self, outcome: BatchOutcome) {
        self.batches += 1;
        self.filtered += outcome.filtered;
        for product in &outcome.products {
            self.brands.insert(product.brand.clone());
            self.categories.insert(product.category);
        }
        self.products.extend(outcome.products);
        self.errors.extend(outcome.errors);
    }

    pub fn total_records(&self) -> usize {
        self.products.len() + self.errors.len() + self.filtered
    }

    pub fn batches_processed(&self) -> usize {
        self.batches
    }

    pub fn finalize(self) -> TransformResult {
        let total_records = self.total_records();
        let valid_records = self.products.len();

        let mut categories_found: Vec<Category> = self.categories.into_iter().collect();
        categories_found.sort_by_key(|category| category.as_str());

        let report = ValidationReport {
            total_records,
            valid_records,
            invalid_records: self.errors.len(),
            filtered_records: self.filtered,
            success_rate: success_rate(valid_records, total_records),
            brands_processed: self.brands.into_iter().collect(),
            categories_found,
            errors: self.errors,
            processing_time: self.started.elapsed().as_secs_f64(),
            batches_processed: self.batches,
            timestamp: self.timestamp,
        };

        TransformResult {
            products: self.products,
            report,
        }
    }
}

/// Percentage with one decimal; zero for an empty run.
pub fn success_rate(valid: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = valid as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn product(brand: &str, category: Category) -> TransformedProduct {
        TransformedProduct {
            product_id: format!("{}-1", brand),
            brand: brand.to_string(),
            name: "Phone".to_string(),
            category,
            sku: "SKU1".to_string(),
            in_stock: true,
            storage_options: vec![],
            color_options: vec![],
            network_technology: None,
            condition: None,
            rating: None,
            review_count: None,
            processed_timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_success_rate_rounding_and_empty() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(2, 3), 66.7);
        assert_eq!(success_rate(1, 8), 12.5);
        assert_eq!(success_rate(5, 5), 100.0);
    }

    #[test]
    fn test_finalize_counts_and_sorted_sets() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let mut metrics = MetricsAggregator::new(ts);

        metrics.absorb(BatchOutcome {
            products: vec![product("Samsung", Category::Handset), product("Apple", Category::Device)],
            errors: vec![ValidationError::structural("unknown", "id", "id is required")],
            filtered: 1,
        });
        metrics.absorb(BatchOutcome {
            products: vec![product("Apple", Category::Tariff)],
            errors: vec![],
            filtered: 2,
        });

        let result = metrics.finalize();
        let report = result.report;
        assert_eq!(report.total_records, 7);
        assert_eq!(report.valid_records, 3);
        assert_eq!(report.invalid_records, 1);
        assert_eq!(report.filtered_records, 3);
        assert_eq!(
            report.valid_records + report.invalid_records + report.filtered_records,
            report.total_records
        );
        assert_eq!(report.success_rate, 42.9);
        assert_eq!(report.brands_processed, vec!["Apple", "Samsung"]);
        assert_eq!(
            report.categories_found,
            vec![Category::Device, Category::Handset, Category::Tariff]
        );
        assert_eq!(report.batches_processed, 2);
        assert_eq!(report.timestamp, ts);
        assert_eq!(result.products.len(), 3);
    }

    #[test]
    fn test_empty_run() {
        let report = MetricsAggregator::new(Utc::now()).finalize().report;
        assert_eq!(report.total_records, 0);
        assert_eq!(report.success_rate, 0.0);
        assert!(report.categories_found.is_empty());
    }
}
