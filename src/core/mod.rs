pub mod classification;
pub mod etl;
pub mod features;
pub mod metrics;
pub mod orchestrator;
pub mod reader;
pub mod validator;

pub use crate::domain::model::{
    Category, RawRecord, RunFailure, TransformResult, TransformedProduct, ValidationError,
    ValidationReport,
};
pub use crate::domain::ports::{ConfigProvider, OutputPaths, Pipeline, RecordBatches, Storage};
pub use crate::utils::error::Result;
