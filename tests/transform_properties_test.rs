use chrono::{TimeZone, Utc};
use handset_etl::core::classification::ClassificationConfig;
use handset_etl::core::features::FeatureConfig;
use handset_etl::core::reader::batches_for;
use handset_etl::core::validator::ValidationRules;
use handset_etl::{RunContext, TransformOrchestrator};
use serde_json::{json, Value};

fn mixed_feed() -> Vec<Value> {
    let mut items = Vec::new();
    for i in 0..25 {
        items.push(json!({
            "id": format!("h{}", i),
            "brand": if i % 2 == 0 { "Samsung" } else { "Xiaomi" },
            "name": format!("Handset {}", i),
            "deviceOptions": [{"color": {"name": "Black"}, "capacityValues": [{"name": "128GB"}]}]
        }));
    }
    for i in 0..5 {
        items.push(json!({"id": format!("t{}", i), "brand": "O2", "name": format!("Unlimited Plan {}", i), "monthlyPrice": 20 + i, "dataAllowance": "Unlimited"}));
    }
    for i in 0..7 {
        items.push(json!({"id": format!("x{}", i), "brand": "Generic", "name": format!("Clear Case {}", i)}));
    }
    items.push(json!({"id": "bad", "brand": "Apple", "name": "iPhone SE", "averageRating": -1}));
    items.push(json!({"id": "", "brand": "Apple", "name": "iPhone 13"}));
    items.push(json!([1, 2, 3]));
    items
}

fn orchestrator() -> TransformOrchestrator {
    TransformOrchestrator::new(
        ClassificationConfig::default(),
        FeatureConfig::default(),
        ValidationRules::default(),
    )
    .unwrap()
}

fn bytes() -> Vec<u8> {
    serde_json::to_vec(&mixed_feed()).unwrap()
}

#[test]
fn test_counts_add_up_for_any_batch_size() {
    let ctx = RunContext::new();
    for batch_size in [1, 3, 7, 100] {
        let result = orchestrator()
            .run(batches_for("feed.json", bytes(), batch_size).unwrap(), &ctx)
            .unwrap();
        let report = &result.report;

        assert_eq!(report.total_records, 40);
        assert_eq!(
            report.filtered_records + report.invalid_records + report.valid_records,
            report.total_records,
            "batch size {}",
            batch_size
        );
        assert_eq!(report.filtered_records, 7);
        assert_eq!(report.invalid_records, 3);
        assert_eq!(report.valid_records, result.products.len());
    }
}

#[test]
fn test_identical_runs_are_identical() {
    let ctx = RunContext::with_timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());

    let first = orchestrator()
        .run(batches_for("feed.json", bytes(), 4).unwrap(), &ctx)
        .unwrap();
    let second = orchestrator()
        .run(batches_for("feed.json", bytes(), 4).unwrap(), &ctx)
        .unwrap();

    assert_eq!(first.products, second.products);

    let mut a = first.report.clone();
    let mut b = second.report.clone();
    a.processing_time = 0.0;
    b.processing_time = 0.0;
    assert_eq!(a, b);
}

#[test]
fn test_outputs_never_carry_excluded_records() {
    let result = orchestrator()
        .run(batches_for("feed.json", bytes(), 10).unwrap(), &RunContext::new())
        .unwrap();

    assert!(result.products.iter().all(|p| !p.name.contains("Case")));
    assert!(result.products.iter().any(|p| p.category.as_str() == "tariff"));

    let serialized = serde_json::to_string(&result.products).unwrap();
    assert!(!serialized.contains("excluded"));
}
