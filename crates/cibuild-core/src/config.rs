//! Run configuration collected from the environment.
//!
//! All environment reads happen here, once, before any step runs. The rest
//! of the crate only sees a validated [`BuildConfig`].

use serde::Serialize;

use crate::error::ConfigError;

/// Selects the workflow (`BUILD`).
pub const BUILD_VAR: &str = "BUILD";
/// Language standard selector (`STANDARD`).
pub const STANDARD_VAR: &str = "STANDARD";
/// Present when running on Travis CI.
pub const CI_VAR: &str = "TRAVIS";
/// Branch being built on CI.
pub const BRANCH_VAR: &str = "TRAVIS_BRANCH";
/// Push credential for the publishing repository.
pub const KEY_VAR: &str = "KEY";

/// `BUILD` value that selects the documentation workflow.
pub const DOCS_BUILD: &str = "Doc";
/// `STANDARD` value that selects the legacy C++98 configuration.
pub const LEGACY_STANDARD: &str = "98";

/// Which workflow to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BuildMode {
    /// Build documentation and publish it.
    Docs,
    /// Configure, build, test and install the library with the given
    /// CMake build type.
    Library { build_type: String },
}

impl BuildMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::Invalid {
                var: BUILD_VAR.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        if value == DOCS_BUILD {
            Ok(BuildMode::Docs)
        } else {
            Ok(BuildMode::Library {
                build_type: value.to_string(),
            })
        }
    }
}

/// C++ language standard the library is built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CxxStandard {
    /// C++98: compiler flag override and C++11 features disabled.
    Cpp98,
    /// Anything else uses the project's default configuration.
    Modern(String),
}

impl CxxStandard {
    pub fn parse(value: &str) -> Self {
        if value == LEGACY_STANDARD {
            CxxStandard::Cpp98
        } else {
            CxxStandard::Modern(value.to_string())
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, CxxStandard::Cpp98)
    }
}

/// CI platform details, present only when running under CI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CiPlatform {
    /// Branch the CI job was triggered for. Always set for docs builds,
    /// which are the only ones that look at it.
    pub branch: Option<String>,
}

/// A credential that must never be printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// The raw value, for building push URLs only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Where and how generated documentation is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishSettings {
    /// GitHub account owning the pages repository.
    pub owner: String,
    /// Pages repository name, also the local clone directory.
    pub repo: String,
    /// Subdirectory of the pages repository receiving the HTML.
    pub target_subdir: String,
    /// Only this branch publishes on CI.
    pub primary_branch: String,
    pub bot_name: String,
    pub bot_email: String,
    pub commit_message: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        PublishSettings {
            owner: "cppformat".to_string(),
            repo: "cppformat.github.io".to_string(),
            target_subdir: "dev".to_string(),
            primary_branch: "master".to_string(),
            bot_name: "amplbot".to_string(),
            bot_email: "viz@ampl.com".to_string(),
            commit_message: "Update documentation".to_string(),
        }
    }
}

impl PublishSettings {
    /// Clone URL: HTTPS on CI, SSH for developer machines.
    pub fn clone_url(&self, on_ci: bool) -> String {
        if on_ci {
            format!("https://github.com/{}/{}.git", self.owner, self.repo)
        } else {
            format!("git@github.com:{}/{}.git", self.owner, self.repo)
        }
    }

    /// Push URL with the credential embedded. Redact before displaying.
    pub fn authenticated_push_url(&self, key: &Secret) -> String {
        format!(
            "https://{}@github.com/{}/{}.git",
            key.expose(),
            self.owner,
            self.repo
        )
    }
}

/// Knobs for the CMake library build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySettings {
    /// Prefix of the project's CMake options (`<PREFIX>_DOC`, ...).
    pub option_prefix: String,
    /// Parallelism passed to `make -j`.
    pub jobs: usize,
    /// Consumer project, relative to the source root.
    pub consumer_project: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings {
            option_prefix: "FMT".to_string(),
            jobs: 4,
            consumer_project: "test/find-package-test".to_string(),
        }
    }
}

/// Validated configuration for a single CI run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    pub mode: BuildMode,
    /// Only required for library builds.
    pub standard: Option<CxxStandard>,
    pub ci: Option<CiPlatform>,
    #[serde(skip)]
    pub push_key: Option<Secret>,
    pub publish: PublishSettings,
    pub library: LibrarySettings,
}

impl BuildConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let build = lookup(BUILD_VAR).ok_or_else(|| ConfigError::MissingVar(BUILD_VAR.into()))?;
        let mode = BuildMode::parse(&build)?;

        let standard = match (&mode, lookup(STANDARD_VAR)) {
            (_, Some(value)) => Some(CxxStandard::parse(&value)),
            (BuildMode::Library { .. }, None) => {
                return Err(ConfigError::MissingVar(STANDARD_VAR.into()))
            }
            (BuildMode::Docs, None) => None,
        };

        let ci = match lookup(CI_VAR) {
            Some(_) => {
                let branch = lookup(BRANCH_VAR);
                if branch.is_none() && mode == BuildMode::Docs {
                    return Err(ConfigError::MissingVar(BRANCH_VAR.into()));
                }
                Some(CiPlatform { branch })
            }
            None => None,
        };

        let push_key = lookup(KEY_VAR).filter(|k| !k.is_empty()).map(Secret::new);

        Ok(BuildConfig {
            mode,
            standard,
            ci,
            push_key,
            publish: PublishSettings::default(),
            library: LibrarySettings::default(),
        })
    }

    /// Override the `make -j` parallelism.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.library.jobs = jobs.max(1);
        self
    }

    pub fn on_ci(&self) -> bool {
        self.ci.is_some()
    }

    /// Standard for library builds; `Modern("")` when unset.
    pub fn standard(&self) -> CxxStandard {
        self.standard
            .clone()
            .unwrap_or_else(|| CxxStandard::Modern(String::new()))
    }
}
