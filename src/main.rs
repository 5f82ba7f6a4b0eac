//! corpinfo command-line entry point.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use corpinfo::config::{load_settings, Config, Settings};
use corpinfo::{
    merge_all, parse_amount_detailed, IntegrationResult, IntegrationService, NamedSource, FIELDS,
};

#[derive(Parser)]
#[command(
    name = "corpinfo",
    about = "Merge scraped company profiles into one canonical record",
    version
)]
struct Cli {
    /// Explicit TOML config file (otherwise discovered via prefer).
    #[arg(long, global = true, env = "CORPINFO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge and coerce source records into a canonical record.
    Integrate {
        /// Source record files, highest precedence first.
        files: Vec<PathBuf>,

        /// Named source as NAME=FILE, ordered by the configured source_order.
        #[arg(long = "source", value_name = "NAME=FILE")]
        sources: Vec<String>,

        /// Write the record into this directory instead of stdout.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Include merged values, provenance and warnings in the output.
        #[arg(long)]
        report: bool,
    },

    /// Merge source records without coercion.
    Merge {
        /// Source record files, highest precedence first.
        files: Vec<PathBuf>,
    },

    /// Parse a Korean monetary amount.
    Amount {
        /// Amount text, e.g. "1조 4천억 원".
        text: String,
    },

    /// Print the canonical schema.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => {
            let config = Config::from_file(path)?;
            let mut settings = Settings::default();
            config.apply_to_settings(&mut settings);
            settings
        }
        None => load_settings().await,
    };
    if cli.compact {
        settings.pretty = false;
    }

    let level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Integrate {
            files,
            sources,
            output_dir,
            report,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = Some(dir);
            }
            let service = IntegrationService::new(settings);
            let result = integrate(&service, &files, &sources)?;
            emit_integration(&service, &result, report)?;
        }
        Commands::Merge { files } => {
            let named = read_positional(&files)?;
            let raw: Vec<&serde_json::Value> = named.iter().map(|s| &s.record).collect();
            print_json(&merge_all(&raw), settings.pretty)?;
        }
        Commands::Amount { text } => {
            let output = match parse_amount_detailed(&text) {
                Some(parsed) => json!({
                    "input": text,
                    "value": parsed.value,
                    "failed_segments": parsed.failed_segments,
                }),
                None => json!({ "input": text, "value": null }),
            };
            print_json(&output, settings.pretty)?;
        }
        Commands::Schema => {
            print_json(&FIELDS, settings.pretty)?;
        }
    }

    Ok(())
}

fn integrate(
    service: &IntegrationService,
    files: &[PathBuf],
    source_args: &[String],
) -> anyhow::Result<IntegrationResult> {
    if files.is_empty() && source_args.is_empty() {
        anyhow::bail!("no sources given; pass FILE arguments or --source NAME=FILE");
    }

    let positional = read_positional(files)?;
    let named = source_args
        .iter()
        .map(|arg| NamedSource::from_arg(arg))
        .collect::<corpinfo::Result<Vec<_>>>()?;

    Ok(service.integrate(&service.assemble_sources(positional, named)))
}

fn read_positional(files: &[PathBuf]) -> anyhow::Result<Vec<NamedSource>> {
    let sources = files
        .iter()
        .map(|path| NamedSource::from_path(path))
        .collect::<corpinfo::Result<Vec<_>>>()?;
    Ok(sources)
}

fn emit_integration(
    service: &IntegrationService,
    result: &IntegrationResult,
    report: bool,
) -> anyhow::Result<()> {
    let settings = service.settings();

    for warning in &result.warnings {
        tracing::warn!("{}", warning);
    }

    let output = if report {
        let provenance: serde_json::Map<String, serde_json::Value> = result
            .provenance
            .iter()
            .map(|(field, _)| {
                let source = result
                    .source_for(field)
                    .map(|s| json!(s))
                    .unwrap_or(serde_json::Value::Null);
                (field.to_string(), source)
            })
            .collect();
        json!({
            "sources": result.sources,
            "merged": result.merged,
            "canonical": result.canonical,
            "provenance": provenance,
            "warnings": result.warnings,
        })
    } else {
        serde_json::to_value(&result.canonical)?
    };

    match settings.output_dir {
        Some(ref dir) => {
            settings.ensure_directories()?;
            let path = result.output_path(dir);
            fs::write(&path, render(&output, settings.pretty)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => print_json(&output, settings.pretty)?,
    }
    Ok(())
}

fn render<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    println!("{}", render(value, pretty)?);
    Ok(())
}
