//! Top-level dispatch between the documentation and library workflows.

use std::time::Instant;

use tracing::{error, info};

use crate::config::BuildMode;
use crate::context::RunContext;
use crate::docs::DocsWorkflow;
use crate::error::Result;
use crate::library::LibraryWorkflow;
use crate::outcome::Outcome;

/// Runs exactly one workflow for a configured CI job.
pub struct Orchestrator;

impl Orchestrator {
    /// Run the workflow selected by `ctx.config.mode`.
    ///
    /// Any failed step aborts the run. Directories and commits created
    /// before the failure are left in place; the next run starts over.
    pub async fn run(ctx: &RunContext) -> Result<Outcome> {
        let start = Instant::now();
        info!(
            mode = ?ctx.config.mode,
            ci = ctx.config.on_ci(),
            source = %ctx.layout.source_root.display(),
            "Starting CI build"
        );

        let result = match &ctx.config.mode {
            BuildMode::Docs => DocsWorkflow::new(ctx).run().await,
            BuildMode::Library { build_type } => LibraryWorkflow::new(ctx, build_type).run().await,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => info!(%outcome, duration_ms, "CI build finished"),
            Err(e) => error!(error = %ctx.redactor().redact(&e.to_string()), duration_ms, "CI build failed"),
        }
        result
    }
}
