//! Runtime secret resolution.
//!
//! Config stores env var NAMES; values are read once at startup into
//! [`ResolvedSecrets`] and passed to constructors. Errors and `Debug` output
//! mention names only, never values.

use anyhow::{bail, Result};

use crate::ServiceConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` when the named env var is unset or blank (trust/peer auth).
    pub db_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("db_password", &self.db_password.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve a named environment variable; blank counts as unset.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve secrets for `cfg`. A missing password is allowed unless
/// `require_db_password` is set (any sslmode other than `disable` implies a
/// remote database, and callers pass `true` there).
pub fn resolve_secrets(cfg: &ServiceConfig, require_db_password: bool) -> Result<ResolvedSecrets> {
    let var = cfg.db.password_env.trim();
    let db_password = resolve_env(var);

    if require_db_password && db_password.is_none() {
        bail!(
            "SECRETS_MISSING: required env var '{}' (db password) is not set or empty",
            var
        );
    }

    Ok(ResolvedSecrets { db_password })
}
