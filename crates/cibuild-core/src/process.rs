//! External command execution.
//!
//! Every step of a workflow is described as a [`CommandSpec`] and handed to
//! a [`CommandRunner`]. The production runner is [`SystemRunner`]; tests use
//! the scripted runner from [`crate::fakes`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{CiError, Result};
use crate::redact::Redactor;

/// A single external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Stage name used in logs and errors.
    pub stage: String,

    /// Executable to run.
    pub program: String,

    pub args: Vec<String>,

    /// Working directory (inherits the driver's when `None`).
    pub cwd: Option<PathBuf>,

    /// Extra environment variables on top of the inherited environment.
    pub env: Vec<(String, String)>,

    /// Bytes written to the child's stdin before waiting on it.
    pub stdin: Option<Vec<u8>>,

    /// Capture stdout/stderr instead of streaming them to the terminal.
    pub capture: bool,

    redactor: Redactor,
}

impl CommandSpec {
    pub fn new(stage: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            stdin: None,
            capture: false,
            redactor: Redactor::none(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Scrub `redactor`'s secret from every rendering of this command.
    pub fn redacted(mut self, redactor: &Redactor) -> Self {
        self.redactor = redactor.clone();
        self
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Shell-like rendering for logs and error messages, secret removed.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        self.redactor.redact(&line)
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, `None` when terminated by a signal.
    pub exit_code: Option<i32>,

    /// Captured stdout (empty unless the command captured output).
    pub stdout: String,

    /// Captured stderr (empty unless the command captured output).
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn with_status(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr.
    ///
    /// The streams are captured separately, so lines are grouped per stream
    /// rather than interleaved in the order the child wrote them.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }

    /// Turn a non-zero status into [`CiError::CommandFailed`].
    pub fn check(self, spec: &CommandSpec) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(CiError::CommandFailed {
                stage: spec.stage.clone(),
                command: spec.display(),
                code: self.exit_code,
            })
        }
    }
}

/// Executes external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion. A non-zero exit is not an error here.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run `spec` and fail on a non-zero exit status.
    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.run(spec).await?.check(spec)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let start = Instant::now();
        let rendered = spec.display();
        info!(stage = %spec.stage, command = %rendered, "Running command");

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        command.envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        if spec.capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        command.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

        let spawn_err = |source| CiError::Spawn {
            command: rendered.clone(),
            source,
        };

        let mut child = command.spawn().map_err(spawn_err)?;
        if let (Some(bytes), Some(mut pipe)) = (&spec.stdin, child.stdin.take()) {
            pipe.write_all(bytes).await.map_err(spawn_err)?;
            // Closing stdin lets readers like `apt-key add -` finish.
            drop(pipe);
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(
            stage = %spec.stage,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(result)
    }
}
