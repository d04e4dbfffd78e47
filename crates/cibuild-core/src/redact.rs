//! Credential scrubbing for anything that reaches a log or the console.

use crate::config::Secret;

/// Placeholder printed instead of the push credential.
pub const PLACEHOLDER: &str = "$KEY";

/// Replaces every occurrence of a secret with [`PLACEHOLDER`].
#[derive(Clone, Default)]
pub struct Redactor {
    secret: Option<String>,
}

impl Redactor {
    pub fn new(secret: Option<&Secret>) -> Self {
        Redactor {
            secret: secret
                .map(|s| s.expose().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// A redactor that leaves text untouched.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn redact(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) => text.replace(secret.as_str(), PLACEHOLDER),
            None => text.to_string(),
        }
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("active", &self.secret.is_some())
            .finish()
    }
}
