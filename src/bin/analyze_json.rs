use anyhow::{Context, Result};
use clap::Parser;
use handset_etl::app::analysis::{analyze, FieldSummary, StructureSummary, SUMMARY_FILE};
use handset_etl::utils::logger;

#[derive(Parser)]
#[command(name = "analyze_json")]
#[command(about = "Map the field hierarchy of a JSON feed with types and occurrence counts")]
struct Args {
    /// JSON file to analyze
    file: String,

    /// Where to write the summary
    #[arg(short, long, default_value = SUMMARY_FILE)]
    output: String,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose, None);

    println!("\nAnalyzing: {}", args.file);
    println!("{}", "-".repeat(50));

    let content = std::fs::read(&args.file)
        .with_context(|| format!("Error: File not found: {}", args.file))?;
    let document: serde_json::Value = serde_json::from_slice(&content)
        .with_context(|| format!("Error loading file: {}", args.file))?;

    let summary = analyze(&document);
    print_summary(&summary);

    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Could not write {}", args.output))?;
    tracing::debug!("Summary covers {} fields", summary.field_analysis.len());

    println!("\nDetailed analysis saved to {}", args.output);
    Ok(())
}

fn line(path: &str, info: &FieldSummary) -> String {
    format!(
        "{}: {} ({:.1}%) [{}]",
        path,
        info.count,
        info.percentage,
        info.types.join(", ")
    )
}

fn print_summary(summary: &StructureSummary) {
    println!("Total items: {}\n", summary.total_items);
    println!("Field Analysis (name: count [type]):");
    println!("{}", "=".repeat(50));

    for (path, info) in summary.top_level() {
        println!("{}", line(path, info));
    }

    let mut nested = summary.nested().peekable();
    if nested.peek().is_some() {
        println!("\nNested Fields:");
        for (path, info) in nested {
            let depth = path.matches('.').count() + path.matches('[').count();
            println!("{}{}", "  ".repeat(depth), line(path, info));
        }
    }

    println!("\n{}", "=".repeat(50));
    println!("Fields present in ALL items:");
    for (path, info) in summary.top_level().filter(|(_, info)| info.present_in_all) {
        println!("  {}: {} [{}]", path, info.count, info.types.join(", "));
    }
}
