//! Command handler modules for ocs-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod order;
pub mod publish;

use anyhow::Result;
use ocs_config::ServiceConfig;
use std::path::Path;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve the service config for commands that need connection settings.
///
/// Explicit `--config` paths win, then `OCS_CONFIG`. When neither is given
/// and the default file is absent, built-in defaults (plus env overrides)
/// are used so the CLI works from any directory.
pub fn load_cli_config(explicit: &[String]) -> Result<ServiceConfig> {
    let paths = if explicit.is_empty() {
        ocs_config::config_paths_from_env()
    } else {
        explicit.to_vec()
    };

    let only_default = paths.len() == 1 && paths[0] == ocs_config::DEFAULT_CONFIG_PATH;
    if only_default && !Path::new(ocs_config::DEFAULT_CONFIG_PATH).exists() {
        let mut cfg = ServiceConfig::default();
        cfg.apply_env_overrides();
        return Ok(cfg);
    }

    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let (loaded, cfg) = ocs_config::load_service_config(&path_refs)?;

    let report = ocs_config::report_unused_keys(&loaded.config_json);
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in &report.unused_leaf_pointers {
            eprintln!("  unused={}", p);
        }
    }
    Ok(cfg)
}
