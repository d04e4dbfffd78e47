//! Successful end states of a run.

use serde::Serialize;

/// How a run finished when it did not fail. All variants exit with 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// Documentation was committed and pushed.
    Published { repo: String },
    /// Documentation was rebuilt but the pages repository had no changes.
    Unchanged { repo: String },
    /// CI job on a branch that does not publish; nothing was done.
    SkippedBranch { branch: String },
    /// Documentation was built but no push credential was available.
    SkippedPublish { repo: String },
    /// Library built, tested, installed, and found by the consumer project.
    LibraryVerified,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Published { repo } => write!(f, "published documentation to {repo}"),
            Outcome::Unchanged { repo } => write!(f, "no documentation changes for {repo}"),
            Outcome::SkippedBranch { branch } => write!(f, "skipped: branch {branch} does not publish"),
            Outcome::SkippedPublish { repo } => write!(f, "skipped update of {repo}"),
            Outcome::LibraryVerified => write!(f, "library built, tested and installed"),
        }
    }
}
