pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::CatalogPipeline;
pub use config::{storage::LocalStorage, toml_config::TomlConfig};
pub use core::{
    etl::EtlEngine,
    orchestrator::{RunContext, TransformOrchestrator},
};
pub use utils::error::{EtlError, Result};
