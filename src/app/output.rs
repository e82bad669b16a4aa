//! Serialized forms of the transform result.

use crate::domain::model::{format_timestamp, TransformedProduct, ValidationError, ValidationReport};
use crate::utils::error::{EtlError, Result};

pub const PRODUCTS_JSON: &str = "products.json";
pub const PRODUCTS_CSV: &str = "products.csv";
pub const VALIDATION_REPORT: &str = "validation_report.json";
pub const VALIDATION_ERRORS: &str = "validation_errors.json";

pub const CSV_COLUMNS: [&str; 13] = [
    "product_id",
    "brand",
    "name",
    "category",
    "sku",
    "in_stock",
    "storage_options",
    "color_options",
    "network_technology",
    "condition",
    "rating",
    "review_count",
    "processed_timestamp",
];

const LIST_SEPARATOR: &str = "|";

pub fn render_json(products: &[TransformedProduct]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(products)?)
}

/// Fixed column order; the header is written even for an empty product list.
pub fn render_csv(products: &[TransformedProduct]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for product in products {
        writer.write_record([
            product.product_id.clone(),
            product.brand.clone(),
            product.name.clone(),
            product.category.to_string(),
            product.sku.clone(),
            if product.in_stock { "Yes" } else { "No" }.to_string(),
            product.storage_options.join(LIST_SEPARATOR),
            product.color_options.join(LIST_SEPARATOR),
            product.network_technology.clone().unwrap_or_default(),
            product.condition.clone().unwrap_or_default(),
            product.rating.map(|r| r.to_string()).unwrap_or_default(),
            product.review_count.map(|c| c.to_string()).unwrap_or_default(),
            format_timestamp(&product.processed_timestamp),
        ])?;
    }

    writer.into_inner().map_err(|e| EtlError::WriteError {
        path: PRODUCTS_CSV.to_string(),
        message: e.to_string(),
    })
}

pub fn render_report(report: &ValidationReport) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(report)?)
}

pub fn render_errors(errors: &[ValidationError]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(errors)?)
}
