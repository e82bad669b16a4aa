pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
pub mod cli {
    use super::toml_config::TomlConfig;
    use crate::utils::error::Result;
    use clap::Parser;

    /// Command-line options. Values given here override the TOML file.
    #[derive(Debug, Clone, Parser)]
    #[command(name = "handset-etl")]
    #[command(about = "Classify, normalize and validate a mixed product catalogue")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        pub config: Option<String>,

        /// Product feed (.json array/object, or .jsonl/.ndjson)
        #[arg(long, env = "INPUT_FILE")]
        pub input_file: Option<String>,

        /// Directory for products.json, products.csv and the reports
        #[arg(long, env = "OUTPUT_DIR")]
        pub output_path: Option<String>,

        #[arg(long, env = "BATCH_SIZE")]
        pub batch_size: Option<usize>,

        #[arg(long, env = "LOG_LEVEL")]
        pub log_level: Option<String>,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per phase")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl CliConfig {
        /// Loads the TOML file (or defaults) and applies the command-line overrides.
        pub fn load(&self) -> Result<TomlConfig> {
            let mut config = match &self.config {
                Some(path) => TomlConfig::from_file(path)?,
                None => TomlConfig::default(),
            };
            self.apply_to(&mut config);
            Ok(config)
        }

        pub fn apply_to(&self, config: &mut TomlConfig) {
            if let Some(input_file) = &self.input_file {
                config.source.input_file = input_file.clone();
            }
            if let Some(output_path) = &self.output_path {
                config.load.output_path = output_path.clone();
            }
            if let Some(batch_size) = self.batch_size {
                config.extract.batch_size = batch_size;
            }
            if let Some(level) = &self.log_level {
                config.monitoring.log_level = Some(level.clone());
            }
            if self.monitor {
                config.monitoring.enabled = true;
            }
        }
    }

}
