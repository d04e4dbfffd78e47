//! cibuild - CI build driver
//!
//! Invoked by the CI system with `BUILD` (and friends) in the environment.
//!
//! ## Commands
//!
//! - `run` (default): build and publish documentation, or build, test and
//!   install the library
//! - `show-config`: print the configuration resolved from the environment

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};

use cibuild_core::{
    BuildConfig, BuildLayout, CiError, Orchestrator, Outcome, Redactor, RunContext,
    ScriptDocBuilder,
};

#[derive(Parser)]
#[command(name = "cibuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "CI build driver: publish documentation or build, test and install the library",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and run summary
    #[arg(long, global = true)]
    json: bool,

    /// Source root (default: current directory)
    #[arg(long, global = true, env = "CIBUILD_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Parallel jobs for make
    #[arg(short, long, global = true, default_value_t = 4)]
    jobs: usize,

    /// Directory containing the documentation build helper (default: <source>/doc)
    #[arg(long, global = true)]
    doc_dir: Option<PathBuf>,

    /// Python interpreter used to run the documentation helper
    #[arg(long, global = true, default_value = "python")]
    python: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run the workflow selected by BUILD
    Run,

    /// Print the resolved configuration as JSON
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cibuild_core::init_tracing(cli.json, level);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return report_failure(&e, &Redactor::none()),
    };
    let redactor = Redactor::new(config.push_key.as_ref());

    match execute(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e, &redactor),
    }
}

fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let config = BuildConfig::from_env()
        .map_err(CiError::from)
        .context("Invalid CI environment")?;
    Ok(config.with_jobs(cli.jobs))
}

async fn execute(cli: Cli, config: BuildConfig) -> Result<()> {
    let layout = resolve_layout(&cli, &config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config, layout, &cli.python, cli.json).await,
        Commands::ShowConfig => cmd_show_config(&config, &layout),
    }
}

fn report_failure(err: &anyhow::Error, redactor: &Redactor) -> ExitCode {
    eprintln!("{}", error_message(err, redactor));
    ExitCode::from(exit_code_for(err))
}

/// Final error line with the push credential removed.
fn error_message(err: &anyhow::Error, redactor: &Redactor) -> String {
    redactor.redact(&format!("error: {err:#}"))
}

fn resolve_layout(cli: &Cli, config: &BuildConfig) -> Result<BuildLayout> {
    let source_root = match &cli.source_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let mut layout = BuildLayout::new(source_root, &config.library);
    if let Some(doc_dir) = &cli.doc_dir {
        layout = layout.with_doc_dir(doc_dir);
    }
    Ok(layout)
}

/// Run the selected workflow
async fn cmd_run(
    config: BuildConfig,
    layout: BuildLayout,
    python: &str,
    json: bool,
) -> Result<()> {
    let ctx = RunContext::system(config, layout)?;
    let doc_builder =
        ScriptDocBuilder::new(ctx.runner.clone(), &ctx.layout.doc_dir).with_python(python);
    let ctx = ctx.with_doc_builder(Arc::new(doc_builder));

    let outcome = Orchestrator::run(&ctx).await?;
    debug!(?outcome, "Run complete");
    println!("{}", render_outcome(&outcome, json)?);
    Ok(())
}

/// Summary line for a finished run: plain text, or one JSON object.
fn render_outcome(outcome: &Outcome, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(outcome)?)
    } else {
        Ok(outcome.to_string())
    }
}

/// Print the resolved configuration
fn cmd_show_config(config: &BuildConfig, layout: &BuildLayout) -> Result<()> {
    let report = json!({
        "version": cibuild_core::VERSION,
        "config": config,
        "layout": layout,
        "push_key_present": config.push_key.is_some(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Exit status for a failed run: the driver's own code when the failure came
/// from a workflow step, 1 otherwise.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CiError>()
        .map(CiError::exit_code)
        .unwrap_or(1)
}
