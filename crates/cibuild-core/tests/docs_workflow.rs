//! Integration tests for the documentation workflow with in-memory fakes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cibuild_core::docs::toolchain::{doxygen_url, DOXYGEN_DEB, NODESOURCE_KEY_URL};
use cibuild_core::fakes::{CapturedConsole, FixedDocBuilder, ScriptedRunner, StaticFetcher};
use cibuild_core::{BuildConfig, BuildLayout, CiError, CommandOutput, Orchestrator, Outcome, RunContext};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    source: std::path::PathBuf,
    runner: Arc<ScriptedRunner>,
    fetcher: Arc<StaticFetcher>,
    docs: Arc<FixedDocBuilder>,
    console: Arc<CapturedConsole>,
    ctx: RunContext,
}

fn harness(vars: &[(&str, &str)]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    std::fs::create_dir_all(&source).unwrap();

    let html = dir.path().join("html");
    std::fs::create_dir_all(html.join("_static")).unwrap();
    std::fs::write(html.join("index.html"), b"<html>docs</html>").unwrap();
    std::fs::write(html.join("_static/site.css"), b"body {}").unwrap();
    std::fs::write(html.join(".buildinfo"), b"hidden").unwrap();

    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = BuildConfig::from_lookup(|name| map.get(name).cloned()).unwrap();
    let layout = BuildLayout::new(&source, &config.library);

    let runner = Arc::new(ScriptedRunner::new());
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with(NODESOURCE_KEY_URL, b"-----BEGIN PGP PUBLIC KEY BLOCK-----".to_vec())
            .with(&doxygen_url(), b"deb-bytes".to_vec()),
    );
    let docs = Arc::new(FixedDocBuilder::new(&html));
    let console = Arc::new(CapturedConsole::new());

    let ctx = RunContext::new(
        config,
        layout,
        runner.clone(),
        fetcher.clone(),
        docs.clone(),
        console.clone(),
    );

    Harness {
        _dir: dir,
        source,
        runner,
        fetcher,
        docs,
        console,
        ctx,
    }
}

fn pages_dir(source: &Path) -> std::path::PathBuf {
    source.join("cppformat.github.io")
}

/// Test: local runs never hit the branch guard and always try to publish
#[tokio::test]
async fn test_local_run_attempts_publish() {
    let h = harness(&[("BUILD", "Doc")]);

    let outcome = Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert_eq!(
        outcome,
        Outcome::Unchanged {
            repo: "cppformat.github.io".to_string()
        }
    );
    assert_eq!(h.docs.build_count(), 1);
    assert_eq!(h.runner.stages(), vec!["git_clone", "git_add", "git_diff"]);
    assert!(h.fetcher.requests().is_empty(), "no toolchain install locally");

    let clone = &h.runner.calls_for("git_clone")[0];
    assert!(clone
        .args
        .contains(&"git@github.com:cppformat/cppformat.github.io.git".to_string()));

    let target = pages_dir(&h.source).join("dev");
    assert!(target.join("index.html").is_file());
    assert!(target.join("_static/site.css").is_file());
    assert!(!target.join(".buildinfo").exists());
}

/// Test: CI on a non-primary branch exits cleanly without doing anything
#[tokio::test]
async fn test_ci_non_primary_branch_is_noop() {
    let h = harness(&[
        ("BUILD", "Doc"),
        ("TRAVIS", "true"),
        ("TRAVIS_BRANCH", "feature/x"),
        ("KEY", "tok"),
    ]);

    let outcome = Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert_eq!(
        outcome,
        Outcome::SkippedBranch {
            branch: "feature/x".to_string()
        }
    );
    assert!(h.runner.calls().is_empty());
    assert!(h.fetcher.requests().is_empty());
    assert_eq!(h.docs.build_count(), 0);
    assert_eq!(h.console.lines(), vec!["Branch: feature/x"]);
}

/// Test: CI without a push credential builds docs but does not publish
#[tokio::test]
async fn test_ci_without_key_skips_publish() {
    let h = harness(&[("BUILD", "Doc"), ("TRAVIS", "true"), ("TRAVIS_BRANCH", "master")]);

    let outcome = Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert_eq!(
        outcome,
        Outcome::SkippedPublish {
            repo: "cppformat.github.io".to_string()
        }
    );
    assert_eq!(h.docs.build_count(), 1);
    assert!(h.runner.calls_for("git_clone").is_empty());
    assert_eq!(
        h.console.lines(),
        vec!["Skipping update of cppformat.github.io"]
    );
}

/// Test: CI on master installs the toolchain in order before building
#[tokio::test]
async fn test_ci_installs_toolchain() {
    let h = harness(&[("BUILD", "Doc"), ("TRAVIS", "true"), ("TRAVIS_BRANCH", "master")]);

    Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert_eq!(
        h.runner.stages(),
        vec![
            "apt_key",
            "apt_source",
            "apt_update",
            "apt_install",
            "npm_install",
            "dpkg_install"
        ]
    );

    let apt_key = &h.runner.calls_for("apt_key")[0];
    assert_eq!(apt_key.args, vec!["apt-key", "add", "-"]);
    assert_eq!(
        apt_key.stdin.as_deref(),
        Some(&b"-----BEGIN PGP PUBLIC KEY BLOCK-----"[..])
    );

    let source_list = &h.runner.calls_for("apt_source")[0];
    assert_eq!(
        source_list.stdin.as_deref(),
        Some(&b"deb https://deb.nodesource.com/node_0.10 precise main\n"[..])
    );

    let deb = h.source.join(DOXYGEN_DEB);
    assert_eq!(std::fs::read(&deb).unwrap(), b"deb-bytes");
    let dpkg = &h.runner.calls_for("dpkg_install")[0];
    assert_eq!(dpkg.args.last().unwrap(), &deb.to_string_lossy().to_string());
}

/// Test: a changed tree is committed and pushed exactly once
#[tokio::test]
async fn test_changes_are_committed_and_pushed_once() {
    let h = harness(&[("BUILD", "Doc")]);
    h.runner.respond("git_diff", CommandOutput::with_status(1));

    let outcome = Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert_eq!(
        outcome,
        Outcome::Published {
            repo: "cppformat.github.io".to_string()
        }
    );
    assert_eq!(h.runner.calls_for("git_commit").len(), 1);
    let pushes = h.runner.calls_for("git_push");
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].args, vec!["push"]);
    assert_eq!(pushes[0].cwd.as_deref(), Some(pages_dir(&h.source).as_path()));
    assert!(h.runner.calls_for("git_config").is_empty());
}

/// Test: CI pushes with the embedded credential and never prints it
#[tokio::test]
async fn test_ci_push_redacts_credential() {
    let h = harness(&[
        ("BUILD", "Doc"),
        ("TRAVIS", "true"),
        ("TRAVIS_BRANCH", "master"),
        ("KEY", "sekrit-token"),
    ]);
    h.runner.respond("git_diff", CommandOutput::with_status(1));
    h.runner.respond(
        "git_push",
        CommandOutput::success()
            .with_stdout("To https://sekrit-token@github.com/cppformat/cppformat.github.io.git\n"),
    );

    let outcome = Orchestrator::run(&h.ctx).await.expect("docs run failed");
    assert!(matches!(outcome, Outcome::Published { .. }));

    let push = &h.runner.calls_for("git_push")[0];
    assert_eq!(
        push.args,
        vec![
            "push",
            "https://sekrit-token@github.com/cppformat/cppformat.github.io.git",
            "master"
        ]
    );
    assert_eq!(
        push.display(),
        "git push https://$KEY@github.com/cppformat/cppformat.github.io.git master"
    );

    let text = h.console.text();
    assert!(!text.contains("sekrit-token"));
    assert!(text.contains("https://$KEY@github.com"));

    let configs = h.runner.calls_for("git_config");
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0].args, vec!["config", "--global", "user.name", "amplbot"]);
    assert_eq!(configs[1].args, vec!["config", "--global", "user.email", "viz@ampl.com"]);
}

/// Test: a failed push is fatal and the error message is scrubbed
#[tokio::test]
async fn test_failed_push_is_fatal() {
    let h = harness(&[
        ("BUILD", "Doc"),
        ("TRAVIS", "true"),
        ("TRAVIS_BRANCH", "master"),
        ("KEY", "sekrit-token"),
    ]);
    h.runner.respond("git_diff", CommandOutput::with_status(1));
    h.runner.respond("git_push", CommandOutput::with_status(128));

    let err = Orchestrator::run(&h.ctx).await.unwrap_err();

    assert!(matches!(err, CiError::CommandFailed { code: Some(128), .. }));
    assert_eq!(err.exit_code(), 128);
    assert!(!err.to_string().contains("sekrit-token"));
}

/// Test: stale output in the pages clone is replaced
#[tokio::test]
async fn test_stale_target_is_replaced() {
    let h = harness(&[("BUILD", "Doc")]);
    let stale = pages_dir(&h.source).join("dev");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("old.html"), b"old").unwrap();

    Orchestrator::run(&h.ctx).await.expect("docs run failed");

    assert!(!stale.join("old.html").exists());
    assert!(stale.join("index.html").is_file());
}

/// Test: a failed clone aborts before anything is copied
#[tokio::test]
async fn test_failed_clone_aborts() {
    let h = harness(&[("BUILD", "Doc")]);
    h.runner.respond("git_clone", CommandOutput::with_status(128));

    let err = Orchestrator::run(&h.ctx).await.unwrap_err();

    assert!(matches!(err, CiError::CommandFailed { .. }));
    assert_eq!(h.runner.stages(), vec!["git_clone"]);
    assert!(!pages_dir(&h.source).join("dev").exists());
}
