//! Library workflow: configure, build, test and install with CMake/make,
//! then prove the installed package is usable from a separate project.

use std::path::Path;

use tracing::{info, warn};

use crate::config::CxxStandard;
use crate::context::RunContext;
use crate::error::{CiError, Result};
use crate::layout::ensure_dir;
use crate::outcome::Outcome;

/// Arguments for a `cmake` configure step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureArgs {
    args: Vec<String>,
}

impl ConfigureArgs {
    /// Configure the library itself: docs off, pedantic warnings on.
    pub fn primary(
        install_dir: &Path,
        build_type: &str,
        standard: &CxxStandard,
        option_prefix: &str,
        source_dir: &Path,
    ) -> Self {
        let mut args = common(install_dir, build_type, standard, option_prefix);
        args.push(format!("-D{option_prefix}_DOC=OFF"));
        args.push(format!("-D{option_prefix}_PEDANTIC=ON"));
        args.push(source_dir.to_string_lossy().into_owned());
        Self { args }
    }

    /// Configure the find-package consumer against the install prefix.
    pub fn consumer(
        install_dir: &Path,
        build_type: &str,
        standard: &CxxStandard,
        option_prefix: &str,
        consumer_dir: &Path,
    ) -> Self {
        let mut args = common(install_dir, build_type, standard, option_prefix);
        args.push(consumer_dir.to_string_lossy().into_owned());
        Self { args }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }
}

fn common(
    install_dir: &Path,
    build_type: &str,
    standard: &CxxStandard,
    option_prefix: &str,
) -> Vec<String> {
    let mut args = vec![
        format!("-DCMAKE_INSTALL_PREFIX={}", install_dir.display()),
        format!("-DCMAKE_BUILD_TYPE={build_type}"),
    ];
    if standard.is_legacy() {
        args.push("-DCMAKE_CXX_FLAGS=-std=c++98".to_string());
        args.push(format!("-D{option_prefix}_USE_CPP11=OFF"));
    }
    args
}

/// Builds, tests and installs the library.
pub struct LibraryWorkflow<'a> {
    ctx: &'a RunContext,
    build_type: &'a str,
}

impl<'a> LibraryWorkflow<'a> {
    pub fn new(ctx: &'a RunContext, build_type: &'a str) -> Self {
        Self { ctx, build_type }
    }

    pub async fn run(&self) -> Result<Outcome> {
        let ctx = self.ctx;
        let layout = &ctx.layout;
        let settings = &ctx.config.library;
        let standard = ctx.config.standard();

        info!(
            build_type = %self.build_type,
            legacy = standard.is_legacy(),
            "Building library"
        );

        ensure_dir(&layout.build_dir)?;
        let configure = ConfigureArgs::primary(
            &layout.install_dir,
            self.build_type,
            &standard,
            &settings.option_prefix,
            &layout.source_root,
        );
        self.cmake("configure", &layout.build_dir, &configure).await?;
        self.make_parallel("build", &layout.build_dir).await?;
        self.test().await?;
        ctx.run(
            ctx.command("install", "make")
                .arg("install")
                .current_dir(&layout.build_dir),
        )
        .await?;

        ensure_dir(&layout.test_build_dir)?;
        let consumer = ConfigureArgs::consumer(
            &layout.install_dir,
            self.build_type,
            &standard,
            &settings.option_prefix,
            &layout.consumer_project,
        );
        self.cmake("configure_consumer", &layout.test_build_dir, &consumer)
            .await?;
        self.make_parallel("build_consumer", &layout.test_build_dir)
            .await?;

        info!("Installed package verified by consumer build");
        Ok(Outcome::LibraryVerified)
    }

    async fn cmake(&self, stage: &str, dir: &Path, args: &ConfigureArgs) -> Result<()> {
        let ctx = self.ctx;
        ctx.run(
            ctx.command(stage, "cmake")
                .args(args.as_slice().iter().cloned())
                .current_dir(dir),
        )
        .await?;
        Ok(())
    }

    async fn make_parallel(&self, stage: &str, dir: &Path) -> Result<()> {
        let ctx = self.ctx;
        ctx.run(
            ctx.command(stage, "make")
                .arg(format!("-j{}", ctx.config.library.jobs))
                .current_dir(dir),
        )
        .await?;
        Ok(())
    }

    /// Run the test suite; on failure print the CTest log and fail with
    /// [`CiError::TestsFailed`].
    async fn test(&self) -> Result<()> {
        let ctx = self.ctx;
        let spec = ctx
            .command("test", "make")
            .arg("test")
            .env("CTEST_OUTPUT_ON_FAILURE", "1")
            .current_dir(&ctx.layout.build_dir);
        let output = ctx.runner.run(&spec).await?;
        if output.passed() {
            return Ok(());
        }

        let log_path = ctx.layout.test_log();
        // CTest logs carry raw compiler output; print them even when not UTF-8.
        match tokio::fs::read(&log_path).await {
            Ok(bytes) => ctx.emit(&String::from_utf8_lossy(&bytes)),
            Err(e) => warn!(path = %log_path.display(), error = %e, "Test log unavailable"),
        }
        Err(CiError::TestsFailed)
    }
}
