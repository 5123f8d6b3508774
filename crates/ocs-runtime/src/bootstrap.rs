//! Store bootstrap shared by the daemon and the CLI.
//!
//! `OCS_DATABASE_URL` wins when set; otherwise connection settings come from
//! the `db` config section, with the password read from the env var it names.

use anyhow::Result;
use ocs_config::secrets::{resolve_secrets, ResolvedSecrets};
use ocs_config::ServiceConfig;
use ocs_db::{PgConnectSettings, PgOrderStore, ENV_DB_URL};
use tracing::info;

/// A non-`disable` sslmode means a real remote database, which must not run
/// passwordless.
pub fn requires_db_password(cfg: &ServiceConfig) -> bool {
    !cfg.db.sslmode.trim().eq_ignore_ascii_case("disable")
}

pub fn pg_settings(cfg: &ServiceConfig, secrets: &ResolvedSecrets) -> PgConnectSettings {
    PgConnectSettings {
        host: cfg.db.host.clone(),
        port: cfg.db.port,
        user: cfg.db.user.clone(),
        password: secrets.db_password.clone(),
        dbname: cfg.db.dbname.clone(),
        sslmode: cfg.db.sslmode.clone(),
        max_connections: cfg.db.max_connections,
    }
}

pub async fn open_order_store(cfg: &ServiceConfig) -> Result<PgOrderStore> {
    let pool = if std::env::var(ENV_DB_URL).is_ok_and(|v| !v.trim().is_empty()) {
        info!(source = ENV_DB_URL, "connecting to postgres");
        ocs_db::connect_from_env().await?
    } else {
        let secrets = resolve_secrets(cfg, requires_db_password(cfg))?;
        let settings = pg_settings(cfg, &secrets);
        info!(source = "config", settings = ?settings, "connecting to postgres");
        ocs_db::connect(&settings).await?
    };
    Ok(PgOrderStore::new(pool))
}
