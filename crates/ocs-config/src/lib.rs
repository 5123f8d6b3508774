//! Layered YAML configuration for the order cache service.
//!
//! Loading is done once at process start:
//! 1. YAML documents are deep-merged in order (later documents override).
//! 2. Literal secrets are refused; config stores env var NAMES only.
//! 3. The merged document is canonicalized and hashed (SHA-256).
//! 4. The typed [`ServiceConfig`] is decoded, with defaults for absent keys.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

pub mod secrets;

pub const ENV_CONFIG_PATHS: &str = "OCS_CONFIG";
pub const ENV_NATS_URL: &str = "OCS_NATS_URL";
pub const ENV_DAEMON_ADDR: &str = "OCS_DAEMON_ADDR";
pub const DEFAULT_CONFIG_PATH: &str = "config/service.yaml";

/// If any leaf string value in the effective config starts with one of
/// these, loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
];

/// Keys that may never hold a literal value, whatever it looks like.
const FORBIDDEN_LITERAL_KEYS: &[&str] = &["/db/password"];

// ---------------------------------------------------------------------------
// Typed service config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub db: DbSettings,
    pub nats: NatsSettings,
    pub cache: CacheSettings,
    pub ingest: IngestSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Name of the env var holding the password (never the password itself).
    pub password_env: String,
    pub dbname: String,
    /// libpq sslmode: disable | allow | prefer | require | verify-ca | verify-full
    pub sslmode: String,
    pub max_connections: u32,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password_env: "OCS_DB_PASSWORD".to_string(),
            dbname: "orders".to_string(),
            sslmode: "disable".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsSettings {
    pub url: String,
    pub subject: String,
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            subject: "order".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Applied to every entry. Absent or 0 means entries never expire.
    pub default_ttl_secs: Option<u64>,
    /// Janitor sweep period. 0 disables the sweep (expiry stays lazy).
    pub cleanup_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: None,
            cleanup_interval_secs: 60,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Option<Duration> {
        match self.default_ttl_secs {
            Some(0) | None => None,
            Some(s) => Some(Duration::from_secs(s)),
        }
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        if self.cleanup_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cleanup_interval_secs))
        }
    }
}

/// What ingestion does with an identifier it has already accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace the stored row and the cached value (latest message wins).
    #[default]
    Overwrite,
    /// Keep the first; the store rejects the second row and it is logged.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub addr: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: ServiceConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the service schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply process-level env overrides (OCS_NATS_URL, OCS_DAEMON_ADDR).
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_non_blank(ENV_NATS_URL) {
            self.nats.url = url;
        }
        if let Some(addr) = env_non_blank(ENV_DAEMON_ADDR) {
            self.http.addr = addr;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nats.subject.trim().is_empty() {
            bail!("CONFIG_INVALID: nats.subject must not be empty");
        }
        if self.db.max_connections == 0 {
            bail!("CONFIG_INVALID: db.max_connections must be > 0");
        }
        if self.db.password_env.trim().is_empty() {
            bail!("CONFIG_INVALID: db.password_env must name an env var");
        }
        Ok(())
    }
}

fn env_non_blank(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Config paths from OCS_CONFIG (comma-separated, merge order) or the default.
pub fn config_paths_from_env() -> Vec<String> {
    match env_non_blank(ENV_CONFIG_PATHS) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

// ---------------------------------------------------------------------------
// Unused-key guard
// ---------------------------------------------------------------------------

/// JSON-pointer prefixes the service actually reads. Any leaf not covered is
/// reported as unused (typo guard: a misspelled key silently falls back to
/// its default otherwise).
pub const CONSUMED_POINTERS: &[&str] = &[
    "/db/host",
    "/db/port",
    "/db/user",
    "/db/password_env",
    "/db/dbname",
    "/db/sslmode",
    "/db/max_connections",
    "/nats/url",
    "/nats/subject",
    "/cache/default_ttl_secs",
    "/cache/cleanup_interval_secs",
    "/ingest/duplicate_policy",
    "/http/addr",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

pub fn report_unused_keys(config_json: &Value) -> UnusedKeyReport {
    let consumed: BTreeSet<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    UnusedKeyReport {
        unused_leaf_pointers: unused,
    }
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but NOT "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix)
        && leaf
            .get(prefix.len()..prefix.len() + 1)
            .map(|c| c == "/")
            .unwrap_or(false)
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Load, decode and apply env overrides in one step (binary entry points).
pub fn load_service_config(paths: &[&str]) -> Result<(LoadedConfig, ServiceConfig)> {
    let loaded = load_layered_yaml(paths)?;
    let mut cfg = ServiceConfig::from_loaded(&loaded)?;
    cfg.apply_env_overrides();
    Ok((loaded, cfg))
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's Map is BTreeMap-backed (no preserve_order), so object keys
    // serialize sorted regardless of source order.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    for key in FORBIDDEN_LITERAL_KEYS {
        if v.pointer(key).is_some() {
            bail!(
                "CONFIG_SECRET_DETECTED leaf={} value=REDACTED (use db.password_env)",
                key
            );
        }
    }

    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
