//! # sttm-cli
//!
//! Command-line interface for the STTM mapping engine.
//!
//! Loads a mapping registry, runs input records through the engine, and
//! writes the transformed records as JSON or per-table CSV.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sttm_mapping::{EngineConfig, SttmEngine, TablePolicy};
use sttm_pipeline::{
    AcceptancePolicy, BatchConfig, BatchResult, BatchTransformer, CsvTableWriter, OutputFormat,
    write_json, write_json_lines,
};
use sttm_schema::{Registry, RegistryLoader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sttm")]
#[command(about = "Source-to-target mapping engine CLI")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a JSON file of records
    Transform {
        /// Input file: a JSON array of records or a single record object
        input: PathBuf,

        /// Registry file (YAML or JSON)
        #[arg(short, long)]
        registry: PathBuf,

        /// Output path; a directory for csv. Defaults to stdout for json/jsonl
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// What to do with a record that fails to transform
        #[arg(short, long, value_enum, default_value_t = PolicyArg::FailFast)]
        policy: PolicyArg,

        /// Which table a field is assigned to
        #[arg(long, value_enum, default_value_t = TablePolicyArg::Rule)]
        table_policy: TablePolicyArg,

        /// Maximum number of records transformed at the same time
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Check a registry file for unresolved references and table mismatches
    Validate {
        /// Registry file (YAML or JSON)
        #[arg(short, long)]
        registry: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Jsonl,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Jsonl => OutputFormat::JsonLines,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    FailFast,
    SkipInvalid,
}

impl From<PolicyArg> for AcceptancePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FailFast => AcceptancePolicy::FailFast,
            PolicyArg::SkipInvalid => AcceptancePolicy::SkipInvalid,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TablePolicyArg {
    Rule,
    Destination,
    Strict,
}

impl From<TablePolicyArg> for TablePolicy {
    fn from(arg: TablePolicyArg) -> Self {
        match arg {
            TablePolicyArg::Rule => TablePolicy::Rule,
            TablePolicyArg::Destination => TablePolicy::Destination,
            TablePolicyArg::Strict => TablePolicy::Strict,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Transform {
            input,
            registry,
            output,
            format,
            policy,
            table_policy,
            workers,
        } => {
            let registry = load_registry(&registry, true)?;
            let engine = SttmEngine::with_config(
                Arc::new(registry),
                EngineConfig {
                    table_policy: table_policy.into(),
                },
            );
            let mut config = BatchConfig {
                acceptance_policy: policy.into(),
                ..BatchConfig::default()
            };
            if let Some(workers) = workers {
                config.max_workers = workers;
            }

            let records = read_records(&input)?;
            info!(input = %input.display(), records = records.len(), "Transforming");
            let result = BatchTransformer::new(engine, config)
                .run(records)
                .await
                .context("transform failed")?;
            report_failures(&result);
            write_output(&result, format.into(), output.as_deref())?;
        }
        Commands::Validate { registry } => {
            let loaded = load_registry(&registry, false)?;
            validate(&loaded)?;
            println!(
                "Registry OK: {} sources, {} destinations, {} transforms, {} mappings",
                loaded.sources().len(),
                loaded.destinations().len(),
                loaded.transforms().len(),
                loaded.mapping_rules().len()
            );
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(path: &Path, strict_references: bool) -> anyhow::Result<Registry> {
    RegistryLoader::new()
        .strict_references(strict_references)
        .load_from_file(path)
        .with_context(|| format!("failed to load registry {}", path.display()))
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("input {} is not valid JSON", path.display()))?;
    match parsed {
        Value::Array(records) => Ok(records),
        record @ Value::Object(_) => Ok(vec![record]),
        _ => bail!(
            "input {} must be a JSON array of records or a single record object",
            path.display()
        ),
    }
}

fn report_failures(result: &BatchResult) {
    for failed in &result.failed {
        warn!(index = failed.index, error = %failed.error, "Record skipped");
    }
    if !result.all_succeeded() {
        eprintln!(
            "{} of {} records skipped",
            result.failed.len(),
            result.processed_count()
        );
    }
}

fn write_output(
    result: &BatchResult,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match (format, output) {
        (OutputFormat::Csv, Some(dir)) => {
            let written = CsvTableWriter::new().write_tables(dir, &result.successful)?;
            info!(files = written.len(), dir = %dir.display(), "Wrote CSV tables");
        }
        (OutputFormat::Csv, None) => bail!("csv output needs an output directory (-o)"),
        (format, Some(path)) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_records(BufWriter::new(file), result, format)?;
            info!(path = %path.display(), "Wrote output");
        }
        (format, None) => write_records(std::io::stdout().lock(), result, format)?,
    }
    Ok(())
}

fn write_records<W: Write>(
    writer: W,
    result: &BatchResult,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::JsonLines {
        write_json_lines(writer, &result.successful)?;
    } else {
        write_json(writer, &result.successful)?;
    }
    Ok(())
}

fn validate(registry: &Registry) -> anyhow::Result<()> {
    registry.warn_table_mismatches();

    let problems = registry.check_references();
    if problems.is_empty() {
        return Ok(());
    }
    for problem in &problems {
        eprintln!("error: {problem}");
    }
    bail!("registry has {} unresolved reference(s)", problems.len())
}
