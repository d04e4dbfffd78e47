//! Error types for cibuild-core

use std::path::PathBuf;

use thiserror::Error;

/// Exit status used when the library test suite fails.
///
/// Distinct from whatever `make test` returned so CI logs show the failure
/// came from the test stage.
pub const TESTS_FAILED_EXIT_CODE: u8 = 255;

/// Exit status for configuration problems detected before any work starts.
pub const CONFIG_EXIT_CODE: u8 = 2;

/// Result type for cibuild-core operations
pub type Result<T> = std::result::Result<T, CiError>;

/// Errors raised while reading the environment into a `BuildConfig`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("required environment variable {0} is not set")]
    MissingVar(String),

    /// A variable is set but its value cannot be used
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Errors that abort a CI run
#[derive(Error, Debug)]
pub enum CiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The program could not be started at all
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A step exited with a non-zero status
    #[error("stage '{stage}' failed: `{command}` exited with {}", display_code(.code))]
    CommandFailed {
        stage: String,
        command: String,
        code: Option<i32>,
    },

    /// `make test` failed; the test log has already been printed
    #[error("library tests failed")]
    TestsFailed,

    /// Download of a toolchain artifact failed
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The documentation builder did not produce an output directory
    #[error("documentation build failed: {0}")]
    DocBuild(String),

    /// Filesystem operation failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CiError {
    /// Build an `Io` error bound to the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CiError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status the driver should terminate with.
    pub fn exit_code(&self) -> u8 {
        match self {
            CiError::TestsFailed => TESTS_FAILED_EXIT_CODE,
            CiError::Config(_) => CONFIG_EXIT_CODE,
            CiError::CommandFailed {
                code: Some(code), ..
            } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            _ => 1,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
