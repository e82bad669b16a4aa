use crate::app::output::{
    render_csv, render_errors, render_json, render_report, PRODUCTS_CSV, PRODUCTS_JSON,
    VALIDATION_ERRORS, VALIDATION_REPORT,
};
use crate::core::orchestrator::{RunContext, TransformOrchestrator};
use crate::core::reader::batches_for;
use crate::core::{
    ConfigProvider, OutputPaths, Pipeline, RecordBatches, RunFailure, Storage, TransformResult,
    TransformedProduct, ValidationReport,
};
use crate::utils::error::Result;

/// Reads the feed from `input`, writes products and reports to `output`.
pub struct CatalogPipeline<S: Storage, C: ConfigProvider> {
    input: S,
    output: S,
    config: C,
    orchestrator: TransformOrchestrator,
    context: RunContext,
}

impl<S: Storage, C: ConfigProvider> CatalogPipeline<S, C> {
    pub fn new(input: S, output: S, config: C) -> Result<Self> {
        Self::with_context(input, output, config, RunContext::new())
    }

    pub fn with_context(input: S, output: S, config: C, context: RunContext) -> Result<Self> {
        let orchestrator = TransformOrchestrator::new(
            config.classification().clone(),
            config.features().clone(),
            config.validation().clone(),
        )?;
        Ok(Self {
            input,
            output,
            config,
            orchestrator,
            context,
        })
    }

    /// Shared with the pipeline; cancelling it stops the transform at the next batch.
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    fn output_location(&self, file_name: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), file_name)
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }

    async fn write(&self, file_name: &str, data: &[u8]) -> Result<String> {
        tracing::debug!("Writing {} ({} bytes)", file_name, data.len());
        self.output.write_file(file_name, data).await?;
        Ok(self.output_location(file_name))
    }

    async fn write_products(
        &self,
        products: &[TransformedProduct],
        outputs: &mut OutputPaths,
    ) -> Result<()> {
        if self.wants("json") {
            let path = self.write(PRODUCTS_JSON, &render_json(products)?).await?;
            outputs.insert("json".to_string(), path);
        }

        if self.wants("csv") {
            let path = self.write(PRODUCTS_CSV, &render_csv(products)?).await?;
            outputs.insert("csv".to_string(), path);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CatalogPipeline<S, C> {
    async fn extract(&self) -> Result<RecordBatches> {
        let input_file = self.config.input_file();
        tracing::debug!("Reading product feed: {}", input_file);

        let bytes = self.input.read_file(input_file).await?;
        tracing::info!(
            "📥 Read {} ({:.2} KB), batch size {}",
            input_file,
            bytes.len() as f64 / 1024.0,
            self.config.batch_size()
        );

        batches_for(input_file, bytes, self.config.batch_size())
    }

    async fn transform(
        &self,
        batches: RecordBatches,
    ) -> std::result::Result<TransformResult, RunFailure> {
        self.orchestrator.run(batches, &self.context)
    }

    async fn load(&self, result: TransformResult) -> Result<OutputPaths> {
        let mut outputs = OutputPaths::new();

        if result.products.is_empty() {
            tracing::warn!("No valid products; writing empty outputs");
        }

        // The report is attempted even when a product file could not be written.
        let written = self.write_products(&result.products, &mut outputs).await;
        if let Err(e) = &written {
            tracing::error!("❌ Could not write products: {}", e);
        }
        let report = self.flush_report(&result.report).await;

        written?;
        outputs.insert("report".to_string(), report?);

        Ok(outputs)
    }

    async fn flush_report(&self, report: &ValidationReport) -> Result<String> {
        let path = self.write(VALIDATION_REPORT, &render_report(report)?).await?;

        if report.errors.is_empty() {
            // Never leave a previous run's errors next to a clean report.
            self.output.remove_file(VALIDATION_ERRORS).await?;
        } else {
            let errors_path = self.write(VALIDATION_ERRORS, &render_errors(&report.errors)?).await?;
            tracing::warn!(
                "⚠️ {} validation errors saved to: {}",
                report.errors.len(),
                errors_path
            );
        }

        Ok(path)
    }

    fn empty_report(&self) -> ValidationReport {
        self.context.metrics().finalize().report
    }
}
