use clap::Parser;
use handset_etl::config::toml_config::TomlConfig;
use handset_etl::core::ConfigProvider;
use handset_etl::utils::{logger, validation::Validate};
use handset_etl::{CatalogPipeline, CliConfig, EtlEngine, EtlError, LocalStorage};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // Loaded before logging so `[monitoring] log_level` can pick the filter.
    let loaded = cli.load();
    let log_level = match &loaded {
        Ok(config) => config.log_level(),
        Err(_) => cli.log_level.as_deref(),
    };
    if cli.log_json {
        logger::init_json_logger(cli.verbose, log_level);
    } else {
        logger::init_cli_logger(cli.verbose, log_level);
    }

    tracing::info!("🚀 Starting handset-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(loaded).await {
        tracing::error!(
            "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(loaded: Result<TomlConfig, EtlError>) -> Result<(), EtlError> {
    let config = loaded?;
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let input = LocalStorage::new(".");
    let output = LocalStorage::new(config.output_path());
    let pipeline = CatalogPipeline::new(input, output, config)?;

    let context = pipeline.context().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⚠️ Interrupt received, stopping after the current batch");
            context.cancel();
        }
    });

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    let outputs = engine.run().await?;

    tracing::info!("✅ ETL process completed successfully!");
    println!("✅ ETL process completed successfully!");
    for (kind, path) in &outputs {
        println!("📁 {}: {}", kind, path);
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Input: {}", config.input_file());
    println!("  Output: {}", config.output_path());
    println!("  Batch size: {}", config.batch_size());
    println!("  Formats: {}", config.output_formats().join(", "));
    println!(
        "  Exclusion keywords: {}",
        config.classification.exclusion_keywords.len()
    );
    println!();
}
