//! CLI entry point for natural-language data cleaning.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_cleaning::{
    CleaningConfig, CleaningResult, CompiledRules, DatasetSummary, Pipeline, Table,
    ValidationReport,
};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{error, info};

#[cfg(feature = "ai")]
use lex_cleaning::ai::{AIProvider, GeminiProvider, OpenRouterProvider, ServiceConfig};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;
#[cfg(feature = "ai")]
use tracing::warn;

/// Which language-understanding service interprets the instruction.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    /// Google Gemini (GEMINI_API_KEY)
    Gemini,
    /// OpenRouter (OPENROUTER_API_KEY)
    Openrouter,
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Clean tabular data from plain-language instructions",
    long_about = "Compiles a plain-language cleaning instruction into explicit rules and \
                  applies them to a CSV file, logging every action.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GEMINI_API_KEY        API key for Gemini (--provider gemini)\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (--provider openrouter)\n\n\
                  EXAMPLES:\n  \
                  # Pattern matching only\n  \
                  lex-cleaning -i data.csv -p \"remove duplicates\" --no-ai\n\n  \
                  # Preview the compiled rules\n  \
                  lex-cleaning -i data.csv -p \"fill missing age with median\" --dry-run\n\n  \
                  # Write the cleaned table\n  \
                  lex-cleaning -i data.csv -p \"trim whitespace, standardize column names\" -o clean.csv"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Cleaning instruction, e.g. "remove duplicates, fill missing age with median"
    #[arg(short, long)]
    prompt: String,

    /// Where to write the cleaned table as CSV
    #[arg(short, long)]
    output: Option<String>,

    /// Language-understanding service to try before pattern matching
    #[arg(long, value_enum, default_value = "gemini")]
    provider: CliProvider,

    /// Use pattern matching only
    #[arg(long, default_value = "false")]
    no_ai: bool,

    /// Show the load summary, validation issues and compiled rules without executing
    #[arg(long)]
    dry_run: bool,

    /// Print the result report as JSON to stdout (disables logging)
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber. Nothing is logged with `--json` so
/// stdout carries only the report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    let bytes = std::fs::read(&args.input)?;
    info!("Read {} bytes from {}", bytes.len(), args.input);

    let pipeline = build_pipeline(&args)?;

    if args.dry_run {
        return run_dry_run(&pipeline, &args, &bytes);
    }

    let result = match pipeline.run(&bytes, &args.prompt) {
        Ok(result) => result,
        Err(e) => {
            error!("Cleaning failed: {}", e);
            for suggestion in e.suggestions() {
                error!("  try: {}", suggestion);
            }
            return Err(anyhow!("Cleaning failed: {}", e));
        }
    };

    if let Some(ref output) = args.output {
        write_csv(&result.table, output)?;
        info!("Cleaned table written to: {}", output);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, &args);
    }
    Ok(())
}

fn config_for(args: &Args) -> Result<CleaningConfig> {
    Ok(CleaningConfig::builder().use_ai(!args.no_ai).build()?)
}

#[cfg(feature = "ai")]
fn build_pipeline(args: &Args) -> Result<Pipeline> {
    let config = config_for(args)?;
    if args.no_ai {
        info!("Running with pattern matching only (AI disabled)");
        return Ok(Pipeline::builder().config(config).build()?);
    }

    let timeout = config.ai_timeout_secs;
    let provider: Option<Arc<dyn AIProvider>> = match args.provider {
        CliProvider::Gemini => match env::var("GEMINI_API_KEY") {
            Ok(key) if !key.is_empty() => Some(Arc::new(GeminiProvider::with_config(
                key,
                ServiceConfig::gemini().timeout_secs(timeout),
            )?)),
            _ => None,
        },
        CliProvider::Openrouter => match env::var("OPENROUTER_API_KEY") {
            Ok(key) if !key.is_empty() => Some(Arc::new(OpenRouterProvider::with_config(
                key,
                ServiceConfig::openrouter().timeout_secs(timeout),
            )?)),
            _ => None,
        },
    };

    let mut builder = Pipeline::builder().config(config);
    match provider {
        Some(provider) => {
            info!("Interpreting instructions with {}", provider.name());
            builder = builder.ai_provider(provider);
        }
        None => warn!(
            "No API key for {:?}; instructions will be interpreted by pattern matching",
            args.provider
        ),
    }
    Ok(builder.build()?)
}

#[cfg(not(feature = "ai"))]
fn build_pipeline(args: &Args) -> Result<Pipeline> {
    if !args.no_ai {
        tracing::warn!("AI support not compiled in. Using pattern matching.");
    }
    let _ = args.provider;
    Ok(Pipeline::builder().config(config_for(args)?).build()?)
}

/// Load and compile, then print what would happen.
///
/// Uses `println!` on purpose: the preview is the command's output, not a log.
fn run_dry_run(pipeline: &Pipeline, args: &Args, bytes: &[u8]) -> Result<()> {
    let (table, report) = pipeline.load(bytes)?;
    let compiled = pipeline.compile(&args.prompt, table.schema())?;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaning rules");
    println!("{}\n", "=".repeat(80));

    print_summary(&args.input, &table.summary());
    print_validation(&report);
    print_rules(&compiled);

    println!("{}", "=".repeat(80));
    println!("To apply these rules, run without --dry-run");
    println!("{}", "=".repeat(80));
    Ok(())
}

fn print_summary(input: &str, summary: &DatasetSummary) {
    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input);
    println!("  Rows: {}", summary.rows);
    println!("  Columns: {}", summary.columns);
    println!("  Duplicate rows: {}", summary.duplicate_rows);
    println!();

    println!(
        "{:<24} {:<10} {:<10} {:<20}",
        "Column", "Type", "Missing %", "Sample"
    );
    println!("{}", "-".repeat(66));
    for column in &summary.column_summaries {
        println!(
            "{:<24} {:<10} {:<10.1} {:<20}",
            truncate_str(&column.name, 23),
            column.column_type,
            column.missing_percentage,
            truncate_str(column.sample_value.as_deref().unwrap_or("-"), 19)
        );
    }
    println!();
}

fn print_validation(report: &ValidationReport) {
    println!("DATA QUALITY ISSUES");
    println!("{}", "-".repeat(40));
    if report.issues.is_empty() {
        println!("  No data quality issues detected");
    }
    for issue in &report.issues {
        let severity = format!("{:?}", issue.severity).to_lowercase();
        println!("  - [{}] {}", severity, issue.message);
    }
    println!();
}

fn print_rules(compiled: &CompiledRules) {
    println!("COMPILED RULES ({})", compiled.strategy);
    println!("{}", "-".repeat(40));
    for (i, rule) in compiled.rules.iter().enumerate() {
        println!("  {}. {}", i + 1, rule);
    }
    for warning in &compiled.warnings {
        println!("  ! {}", warning);
    }
    println!();
}

fn print_result(result: &CleaningResult, args: &Args) {
    let stats = &result.stats;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, stats.rows_before, stats.columns_before
    );
    match args.output {
        Some(ref output) => println!(
            "Output: {} ({} rows x {} columns)",
            output, stats.rows_after, stats.columns
        ),
        None => println!(
            "Output: not written ({} rows x {} columns), use -o to save",
            stats.rows_after, stats.columns
        ),
    }
    println!("Rules compiled by: {}", result.strategy);
    println!();

    println!("Actions:");
    for entry in &result.action_log {
        println!("  - {}", entry);
    }
    println!();

    println!("Summary:");
    println!(
        "  Rows: {} -> {} ({} removed)",
        stats.rows_before, stats.rows_after, stats.rows_removed
    );
    println!(
        "  Duplicates: {} found, {} removed",
        stats.duplicate_rows, stats.duplicate_rows_removed
    );
    println!(
        "  Missing values: {} -> {}",
        stats.total_missing_before(),
        stats.total_missing_after()
    );
    if result.skipped_count() > 0 {
        println!("  Skipped rules: {}", result.skipped_count());
    }
    for warning in &result.warnings {
        println!("  Warning: {}", warning);
    }
    for message in result.validation.messages() {
        println!("  Data quality: {}", message);
    }
    println!();
}

fn write_csv(table: &Table, path: &str) -> Result<()> {
    let mut df = table.dataframe().clone();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
