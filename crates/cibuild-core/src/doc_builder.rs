//! Documentation builder strategy.
//!
//! The docs workflow only needs "build the docs and tell me where the HTML
//! is". [`ScriptDocBuilder`] does that by calling the `build_docs()` entry
//! point of the project's `build.py` helper.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{CiError, Result};
use crate::process::{CommandRunner, CommandSpec};

/// Produces generated HTML documentation.
#[async_trait]
pub trait DocBuilder: Send + Sync {
    /// Build the documentation and return the HTML output directory.
    async fn build(&self) -> Result<PathBuf>;
}

/// Runs `build.py`'s `build_docs()` through a Python interpreter.
pub struct ScriptDocBuilder {
    runner: Arc<dyn CommandRunner>,
    doc_dir: PathBuf,
    python: String,
}

impl ScriptDocBuilder {
    pub fn new(runner: Arc<dyn CommandRunner>, doc_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            doc_dir: doc_dir.into(),
            python: "python".to_string(),
        }
    }

    /// Use a specific interpreter instead of `python` from `PATH`.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    fn command(&self) -> CommandSpec {
        let script = "import sys\n\
                      sys.path.insert(0, sys.argv[1])\n\
                      import build\n\
                      html_dir = build.build_docs()\n\
                      sys.stdout.write('\\n' + str(html_dir) + '\\n')\n";
        CommandSpec::new("build_docs", &self.python)
            .arg("-c")
            .arg(script)
            .arg(self.doc_dir.to_string_lossy())
            .current_dir(&self.doc_dir)
            .capture()
    }
}

#[async_trait]
impl DocBuilder for ScriptDocBuilder {
    async fn build(&self) -> Result<PathBuf> {
        let spec = self.command();
        let output = self.runner.run(&spec).await?;
        if !output.passed() {
            return Err(CiError::DocBuild(format!(
                "build_docs() exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        let html_dir = parse_output_dir(&output.stdout).ok_or_else(|| {
            CiError::DocBuild("build_docs() did not report an output directory".to_string())
        })?;
        info!(html_dir = %html_dir.display(), "Documentation built");
        Ok(html_dir)
    }
}

/// The helper prints its own progress; the output path is the last line.
fn parse_output_dir(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty() && *line != "None")
        .map(PathBuf::from)
}
