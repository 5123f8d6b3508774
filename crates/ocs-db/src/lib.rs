use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

pub mod orders;
pub mod store;

pub use orders::PgOrderStore;
pub use store::{decode_stored, encode_stored, OrderStore, StoreError};

pub const ENV_DB_URL: &str = "OCS_DATABASE_URL";

/// Connection parameters for [`connect`]. The password is already resolved;
/// `Debug` never prints it.
#[derive(Clone)]
pub struct PgConnectSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    /// libpq-style sslmode: disable | allow | prefer | require | verify-ca | verify-full
    pub sslmode: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for PgConnectSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnectSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("dbname", &self.dbname)
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Connect to Postgres from explicit settings.
pub async fn connect(settings: &PgConnectSettings) -> Result<PgPool> {
    let ssl_mode = PgSslMode::from_str(&settings.sslmode)
        .map_err(|e| anyhow!("invalid sslmode '{}': {e}", settings.sslmode))?;

    let mut opts = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.dbname)
        .ssl_mode(ssl_mode);
    if let Some(pw) = &settings.password {
        opts = opts.password(pw);
    }

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(opts)
        .await
        .with_context(|| {
            format!(
                "failed to connect to Postgres at {}:{}/{}",
                settings.host, settings.port, settings.dbname
            )
        })?;

    info!(host = %settings.host, db = %settings.dbname, "postgres connected");
    Ok(pool)
}

/// Connect to Postgres using OCS_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}
