//! cibuild core - CI build driver
//!
//! Runs one of two workflows selected by the `BUILD` environment variable:
//! - `Doc`: build documentation and publish it to the GitHub Pages repository
//! - anything else: configure, build, test and install the C++ library with
//!   CMake, then verify the install with a find-package consumer build
//!
//! Every external tool is reached through an injectable seam
//! ([`CommandRunner`], [`Fetcher`], [`DocBuilder`], [`Console`]) so the
//! workflows can be exercised with the in-memory [`fakes`].

pub mod config;
pub mod console;
pub mod context;
pub mod doc_builder;
pub mod docs;
pub mod error;
pub mod fakes;
pub mod fetch;
pub mod layout;
pub mod library;
pub mod orchestrator;
pub mod outcome;
pub mod process;
pub mod redact;
pub mod telemetry;

pub use config::{BuildConfig, BuildMode, CiPlatform, CxxStandard, Secret};
pub use console::{Console, StdoutConsole};
pub use context::RunContext;
pub use doc_builder::{DocBuilder, ScriptDocBuilder};
pub use docs::DocsWorkflow;
pub use error::{CiError, ConfigError, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use layout::BuildLayout;
pub use library::{ConfigureArgs, LibraryWorkflow};
pub use orchestrator::Orchestrator;
pub use outcome::Outcome;
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use redact::Redactor;
pub use telemetry::init_tracing;

/// cibuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
