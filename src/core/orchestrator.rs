//! Drives classification, extraction and validation over a lazy batch sequence.

use crate::core::classification::{ClassificationConfig, ClassificationEngine, Verdict};
use crate::core::features::{FeatureConfig, FeatureExtractor};
use crate::core::metrics::{BatchOutcome, MetricsAggregator};
use crate::core::validator::{ValidationRules, Validator};
use crate::domain::model::{
    identifier_of, RawRecord, RunFailure, TransformResult, TransformedProduct, ValidationError,
};
use crate::domain::ports::RecordBatches;
use crate::utils::error::Result;
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-run state: the single timestamp stamped on every product, the clock
/// `processing_time` is measured from, and the cancel flag.
#[derive(Debug, Clone)]
pub struct RunContext {
    timestamp: DateTime<Utc>,
    started: Instant,
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    /// Millisecond precision, matching the serialized form.
    pub fn with_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            started: Instant::now(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Aggregator for this run, timed from context creation.
    pub fn metrics(&self) -> MetricsAggregator {
        MetricsAggregator::since(self.timestamp, self.started)
    }

    /// Takes effect at the next batch boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct TransformOrchestrator {
    classifier: ClassificationEngine,
    extractor: FeatureExtractor,
    validator: Validator,
}

impl TransformOrchestrator {
    pub fn new(
        classification: ClassificationConfig,
        features: FeatureConfig,
        rules: ValidationRules,
    ) -> Result<Self> {
        Ok(Self {
            classifier: ClassificationEngine::new(classification),
            extractor: FeatureExtractor::new(features),
            validator: Validator::new(rules)?,
        })
    }

    /// Pure: the same batch and context always give the same outcome.
    pub fn process_batch(&self, batch: Vec<Value>, ctx: &RunContext) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for item in batch {
            match self.process_record(item, ctx) {
                RecordOutcome::Valid(product) => outcome.products.push(*product),
                RecordOutcome::Invalid(error) => {
                    tracing::warn!(
                        record_id = %error.record_id,
                        field = %error.field,
                        kind = %error.kind,
                        "❌ {}",
                        error.message
                    );
                    outcome.errors.push(error);
                }
                RecordOutcome::Filtered => outcome.filtered += 1,
            }
        }

        outcome
    }

    fn process_record(&self, item: Value, ctx: &RunContext) -> RecordOutcome {
        let fallback_id = identifier_of(item.get("id"));
        let record = match RawRecord::from_value(item) {
            Ok(record) => record,
            Err(e) => {
                return RecordOutcome::Invalid(ValidationError::structural(
                    fallback_id,
                    "record",
                    format!("record could not be decoded: {}", e),
                ))
            }
        };

        let classification = self.classifier.classify(&record);
        let category = match classification.verdict {
            Verdict::Excluded { ref keyword } => {
                tracing::debug!(record_id = %record.identifier(), keyword = %keyword, "Record excluded");
                return RecordOutcome::Filtered;
            }
            Verdict::Included(category) => category,
        };

        if classification.fell_back {
            tracing::debug!(record_id = %record.identifier(), "Score below threshold, classified as {}", category);
        }
        if classification.ambiguous {
            tracing::debug!(
                record_id = %record.identifier(),
                scores = ?classification.scores,
                "Ambiguous classification resolved to {}",
                category
            );
        }

        let facets = self.extractor.extract(&record);
        match self.validator.validate(&record, category, facets, ctx.timestamp()) {
            Ok(product) => RecordOutcome::Valid(Box::new(product)),
            Err(error) => RecordOutcome::Invalid(error),
        }
    }

    /// Consumes `batches` to completion, a read error, or cancellation.
    pub fn run(
        &self,
        batches: RecordBatches,
        ctx: &RunContext,
    ) -> std::result::Result<TransformResult, RunFailure> {
        let mut metrics = ctx.metrics();

        for batch in batches {
            if ctx.is_cancelled() {
                tracing::warn!(
                    "⚠️ Run cancelled after {} batches, finalizing partial results",
                    metrics.batches_processed()
                );
                break;
            }

            match batch {
                Ok(records) => {
                    tracing::debug!(
                        "Processing batch {} ({} records)",
                        metrics.batches_processed() + 1,
                        records.len()
                    );
                    metrics.absorb(self.process_batch(records, ctx));
                }
                Err(error) => {
                    tracing::error!(
                        "❌ Read failed after {} batches: {}",
                        metrics.batches_processed(),
                        error
                    );
                    return Err(RunFailure {
                        error,
                        partial: metrics.finalize(),
                    });
                }
            }
        }

        let result = metrics.finalize();
        tracing::info!(
            "📊 Transformed {} records: {} valid, {} invalid, {} filtered ({}% success)",
            result.report.total_records,
            result.report.valid_records,
            result.report.invalid_records,
            result.report.filtered_records,
            result.report.success_rate
        );
        Ok(result)
    }
}

enum RecordOutcome {
    Valid(Box<TransformedProduct>),
    Invalid(ValidationError),
    Filtered,
}
