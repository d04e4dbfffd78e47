//! Everything a workflow needs for one run: configuration, layout, and the
//! injected collaborators that reach outside the process.

use std::sync::Arc;

use crate::config::BuildConfig;
use crate::console::{Console, StdoutConsole};
use crate::doc_builder::{DocBuilder, ScriptDocBuilder};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::layout::BuildLayout;
use crate::process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
use crate::redact::Redactor;

/// Shared state for a single CI run.
pub struct RunContext {
    pub config: BuildConfig,
    pub layout: BuildLayout,
    pub runner: Arc<dyn CommandRunner>,
    pub fetcher: Arc<dyn Fetcher>,
    pub doc_builder: Arc<dyn DocBuilder>,
    pub console: Arc<dyn Console>,
    redactor: Redactor,
}

impl RunContext {
    /// Context wired to real processes, HTTP and stdout.
    pub fn system(config: BuildConfig, layout: BuildLayout) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
        let doc_builder = Arc::new(ScriptDocBuilder::new(runner.clone(), &layout.doc_dir));
        Ok(Self::new(
            config,
            layout,
            runner,
            Arc::new(HttpFetcher::new()?),
            doc_builder,
            Arc::new(StdoutConsole),
        ))
    }

    pub fn new(
        config: BuildConfig,
        layout: BuildLayout,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn Fetcher>,
        doc_builder: Arc<dyn DocBuilder>,
        console: Arc<dyn Console>,
    ) -> Self {
        let redactor = Redactor::new(config.push_key.as_ref());
        Self {
            config,
            layout,
            runner,
            fetcher,
            doc_builder,
            console,
            redactor,
        }
    }

    /// Replace the documentation builder.
    pub fn with_doc_builder(mut self, doc_builder: Arc<dyn DocBuilder>) -> Self {
        self.doc_builder = doc_builder;
        self
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Start a command whose rendering is scrubbed of the push credential.
    pub fn command(&self, stage: &str, program: &str) -> CommandSpec {
        CommandSpec::new(stage, program).redacted(&self.redactor)
    }

    /// Print `text` to the console with the push credential removed.
    pub fn emit(&self, text: &str) {
        self.console.emit(&self.redactor.redact(text));
    }

    /// Run a command, failing on non-zero exit.
    pub async fn run(&self, spec: CommandSpec) -> Result<CommandOutput> {
        self.runner.run_checked(&spec).await
    }
}
