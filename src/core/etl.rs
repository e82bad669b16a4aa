use crate::core::{OutputPaths, Pipeline, ValidationReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract, transform, load. Every failure still writes a report: an empty
    /// one when extract fails, the partial one when transform fails part way.
    pub async fn run(&self) -> Result<OutputPaths> {
        tracing::info!("🚀 Starting ETL process");
        self.monitor.log_stats("Start");

        tracing::info!("📥 Extracting records...");
        let batches = match self.pipeline.extract().await {
            Ok(batches) => batches,
            Err(e) => {
                tracing::error!("❌ Extract failed: {}", e);
                self.flush(&self.pipeline.empty_report()).await;
                self.monitor.log_final_stats();
                return Err(e);
            }
        };
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Transforming records...");
        let result = match self.pipeline.transform(batches).await {
            Ok(result) => result,
            Err(failure) => {
                tracing::error!("❌ {}", failure);
                self.flush(&failure.partial.report).await;
                self.monitor.log_final_stats();
                return Err(failure.error);
            }
        };
        tracing::info!(
            "Transformed {} records into {} products",
            result.report.total_records,
            result.products.len()
        );
        self.monitor.log_throughput("Transform", result.report.total_records);

        tracing::info!("📤 Loading outputs...");
        let outputs = self.pipeline.load(result).await?;
        for (kind, path) in &outputs {
            tracing::info!("📁 {} output saved to: {}", kind, path);
        }
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(outputs)
    }

    async fn flush(&self, report: &ValidationReport) {
        match self.pipeline.flush_report(report).await {
            Ok(path) => tracing::info!("📁 Partial report saved to: {}", path),
            Err(e) => tracing::error!("❌ Could not write partial report: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::MetricsAggregator;
    use crate::core::{RecordBatches, RunFailure, TransformResult};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubPipeline {
        fail_extract: bool,
        fail_transform: bool,
        flushed: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<RecordBatches> {
            if self.fail_extract {
                return Err(EtlError::ReadError {
                    source_name: "feed.json".to_string(),
                    message: "invalid JSON".to_string(),
                });
            }
            Ok(Box::new(std::iter::empty()))
        }

        async fn transform(
            &self,
            _batches: RecordBatches,
        ) -> std::result::Result<TransformResult, RunFailure> {
            let partial = MetricsAggregator::new(Utc::now()).finalize();
            if self.fail_transform {
                Err(RunFailure {
                    error: EtlError::ReadError {
                        source_name: "feed.jsonl".to_string(),
                        message: "truncated".to_string(),
                    },
                    partial,
                })
            } else {
                Ok(partial)
            }
        }

        async fn load(&self, _result: TransformResult) -> Result<OutputPaths> {
            Ok(OutputPaths::from([("json".to_string(), "out/products.json".to_string())]))
        }

        async fn flush_report(&self, report: &ValidationReport) -> Result<String> {
            self.flushed.lock().unwrap().push(report.total_records);
            Ok("out/validation_report.json".to_string())
        }

        fn empty_report(&self) -> ValidationReport {
            MetricsAggregator::new(Utc::now()).finalize().report
        }
    }

    #[tokio::test]
    async fn test_successful_run_returns_outputs() {
        let engine = EtlEngine::new(StubPipeline::default());
        let outputs = engine.run().await.unwrap();
        assert_eq!(outputs["json"], "out/products.json");
        assert!(engine.pipeline.flushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transform_flushes_partial_report() {
        let engine = EtlEngine::new(StubPipeline {
            fail_transform: true,
            ..StubPipeline::default()
        });
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EtlError::ReadError { .. }));
        assert_eq!(engine.pipeline.flushed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_extract_flushes_empty_report() {
        let engine = EtlEngine::new(StubPipeline {
            fail_extract: true,
            ..StubPipeline::default()
        });
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EtlError::ReadError { .. }));
        assert_eq!(*engine.pipeline.flushed.lock().unwrap(), vec![0]);
    }
}
