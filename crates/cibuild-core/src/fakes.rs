//! In-memory fakes for the workflow seams (testing only)
//!
//! Provides `ScriptedRunner`, `StaticFetcher`, `FixedDocBuilder`, and
//! `CapturedConsole`, which satisfy the runner, fetcher, doc-builder and
//! console traits without touching the network or spawning processes.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::console::Console;
use crate::doc_builder::DocBuilder;
use crate::error::{CiError, Result};
use crate::fetch::Fetcher;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// Records every command and answers with scripted outputs keyed by stage.
///
/// Stages without a scripted response succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandSpec>>,
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` as the next answer for `stage`.
    pub fn respond(&self, stage: &str, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .entry(stage.to_string())
            .or_default()
            .push_back(output);
    }

    /// Commands received so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Stage names received so far, in order.
    pub fn stages(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.stage).collect()
    }

    /// Commands whose stage equals `stage`.
    pub fn calls_for(&self, stage: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.stage == stage)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&spec.stage)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(CommandOutput::success))
    }
}

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

/// Serves fixed bodies per URL; unknown URLs fail.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| CiError::Fetch {
            url: url.to_string(),
            reason: "404 Not Found".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FixedDocBuilder
// ---------------------------------------------------------------------------

/// Returns a pre-generated HTML directory and counts invocations.
#[derive(Debug)]
pub struct FixedDocBuilder {
    html_dir: PathBuf,
    builds: Mutex<usize>,
}

impl FixedDocBuilder {
    pub fn new(html_dir: impl Into<PathBuf>) -> Self {
        Self {
            html_dir: html_dir.into(),
            builds: Mutex::new(0),
        }
    }

    pub fn build_count(&self) -> usize {
        *self.builds.lock().unwrap()
    }
}

#[async_trait]
impl DocBuilder for FixedDocBuilder {
    async fn build(&self) -> Result<PathBuf> {
        *self.builds.lock().unwrap() += 1;
        Ok(self.html_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// CapturedConsole
// ---------------------------------------------------------------------------

/// Collects console output in memory.
#[derive(Debug, Default)]
pub struct CapturedConsole {
    lines: Mutex<Vec<String>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

impl Console for CapturedConsole {
    fn emit(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}
