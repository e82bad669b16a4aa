use crate::core::classification::ClassificationConfig;
use crate::core::features::FeatureConfig;
use crate::core::validator::ValidationRules;
use crate::domain::model::{RunFailure, TransformResult, ValidationReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Lazy, finite, single-pass sequence of raw record batches. An `Err` item is
/// a fatal read failure.
pub type RecordBatches = Box<dyn Iterator<Item = Result<Vec<serde_json::Value>>> + Send>;

/// Output kind (`json`, `csv`, `report`, `errors`) to written path.
pub type OutputPaths = BTreeMap<String, String>;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Removing a file that does not exist succeeds.
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_file(&self) -> &str;
    fn output_path(&self) -> &str;
    fn batch_size(&self) -> usize;
    fn output_formats(&self) -> &[String];
    fn classification(&self) -> &ClassificationConfig;
    fn features(&self) -> &FeatureConfig;
    fn validation(&self) -> &ValidationRules;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RecordBatches>;
    async fn transform(
        &self,
        batches: RecordBatches,
    ) -> std::result::Result<TransformResult, RunFailure>;
    async fn load(&self, result: TransformResult) -> Result<OutputPaths>;
    /// Writes only the report, for runs that failed part way through.
    async fn flush_report(&self, report: &ValidationReport) -> Result<String>;
    /// Report for a run that failed before any record was read.
    fn empty_report(&self) -> ValidationReport;
}
