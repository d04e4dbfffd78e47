//! Documentation workflow: build the docs and publish them to the GitHub
//! Pages repository.

pub mod toolchain;

use std::path::Path;

use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::Result;
use crate::layout::{copy_tree_visible, remove_dir_if_exists};
use crate::outcome::Outcome;

/// Builds and publishes documentation.
pub struct DocsWorkflow<'a> {
    ctx: &'a RunContext,
}

impl<'a> DocsWorkflow<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<Outcome> {
        let ctx = self.ctx;
        let publish = &ctx.config.publish;

        if let Some(ci) = &ctx.config.ci {
            let branch = ci.branch.as_deref().unwrap_or_default();
            if branch != publish.primary_branch {
                info!(branch = %branch, "Branch does not publish documentation");
                ctx.emit(&format!("Branch: {branch}"));
                return Ok(Outcome::SkippedBranch {
                    branch: branch.to_string(),
                });
            }
            toolchain::install(ctx).await?;
        }

        let html_dir = ctx.doc_builder.build().await?;

        let repo = publish.repo.clone();
        if ctx.config.on_ci() && ctx.config.push_key.is_none() {
            // Builds from forks have no push access.
            warn!(repo = %repo, "No push credential, not publishing");
            ctx.emit(&format!("Skipping update of {repo}"));
            return Ok(Outcome::SkippedPublish { repo });
        }

        let clone_dir = ctx.layout.publish_clone_dir(&repo);
        self.clone_pages_repo(&clone_dir).await?;

        let target_dir = clone_dir.join(&publish.target_subdir);
        remove_dir_if_exists(&target_dir)?;
        let copied = copy_tree_visible(&html_dir, &target_dir)?;
        info!(files = copied, target = %target_dir.display(), "Copied documentation");

        if ctx.config.on_ci() {
            self.configure_bot_identity().await?;
        }

        if self.commit_if_changed(&clone_dir).await? {
            self.push(&clone_dir).await?;
            Ok(Outcome::Published { repo })
        } else {
            info!(repo = %repo, "Documentation unchanged");
            Ok(Outcome::Unchanged { repo })
        }
    }

    async fn clone_pages_repo(&self, clone_dir: &Path) -> Result<()> {
        let ctx = self.ctx;
        remove_dir_if_exists(clone_dir)?;
        let url = ctx.config.publish.clone_url(ctx.config.on_ci());
        ctx.run(
            ctx.command("git_clone", "git")
                .args(["clone", url.as_str()])
                .arg(clone_dir.to_string_lossy())
                .current_dir(&ctx.layout.source_root),
        )
        .await?;
        Ok(())
    }

    async fn configure_bot_identity(&self) -> Result<()> {
        let ctx = self.ctx;
        let publish = &ctx.config.publish;
        ctx.run(
            ctx.command("git_config", "git")
                .args(["config", "--global", "user.name", publish.bot_name.as_str()]),
        )
        .await?;
        ctx.run(
            ctx.command("git_config", "git")
                .args(["config", "--global", "user.email", publish.bot_email.as_str()]),
        )
        .await?;
        Ok(())
    }

    /// Stage everything and commit when the tree differs from HEAD.
    /// Returns whether a commit was made.
    async fn commit_if_changed(&self, clone_dir: &Path) -> Result<bool> {
        let ctx = self.ctx;
        ctx.run(
            ctx.command("git_add", "git")
                .args(["add", "--all"])
                .current_dir(clone_dir),
        )
        .await?;

        // Non-zero means "differs"; it is a signal, not a failure.
        let diff = ctx
            .runner
            .run(
                &ctx.command("git_diff", "git")
                    .args(["diff-index", "--quiet", "HEAD"])
                    .current_dir(clone_dir),
            )
            .await?;
        if diff.passed() {
            return Ok(false);
        }

        ctx.run(
            ctx.command("git_commit", "git")
                .args(["commit", "-m", ctx.config.publish.commit_message.as_str()])
                .current_dir(clone_dir),
        )
        .await?;
        Ok(true)
    }

    async fn push(&self, clone_dir: &Path) -> Result<()> {
        let ctx = self.ctx;
        let publish = &ctx.config.publish;

        let mut spec = ctx
            .command("git_push", "git")
            .arg("push")
            .current_dir(clone_dir)
            .capture();
        if let (true, Some(key)) = (ctx.config.on_ci(), &ctx.config.push_key) {
            spec = spec
                .arg(publish.authenticated_push_url(key))
                .arg(publish.primary_branch.as_str());
        }

        let output = ctx.runner.run(&spec).await?;
        ctx.emit(&output.combined());
        output.check(&spec)?;
        info!(repo = %publish.repo, "Pushed documentation");
        Ok(())
    }
}
