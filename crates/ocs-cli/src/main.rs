use anyhow::Result;
use clap::{Parser, Subcommand};
use ocs_db::OrderStore;

mod commands;

#[derive(Parser)]
#[command(name = "ocs")]
#[command(about = "Order cache service CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (default: OCS_CONFIG, then config/service.yaml)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overlay...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Publish an order document to the bus
    Publish {
        /// Order JSON file
        #[arg(long, default_value = "fixtures/model.json")]
        file: String,

        /// Subject (default: nats.subject from config)
        #[arg(long)]
        subject: Option<String>,

        /// NATS server URL (default: nats.url from config / OCS_NATS_URL)
        #[arg(long)]
        nats_url: Option<String>,

        /// Replace order_uid with a fresh UUID for every message
        #[arg(long, default_value_t = false)]
        fresh_uid: bool,

        /// Number of messages to send
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Order lookups against the store
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply embedded SQL migrations (idempotent).
    Migrate,
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Print one stored order
    Get {
        #[arg(long)]
        order_uid: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let cfg = commands::load_cli_config(&cli.config_paths)?;
            let store = ocs_runtime::bootstrap::open_order_store(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = ocs_db::status(store.pool()).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                    if s.has_orders_table {
                        println!("orders={}", store.count().await?);
                    }
                }
                DbCmd::Migrate => {
                    ocs_db::migrate(store.pool()).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = ocs_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Publish {
            file,
            subject,
            nats_url,
            fresh_uid,
            count,
        } => {
            let cfg = commands::load_cli_config(&cli.config_paths)?;
            commands::publish::publish(commands::publish::PublishArgs {
                file,
                subject: subject.unwrap_or(cfg.nats.subject),
                nats_url: nats_url.unwrap_or(cfg.nats.url),
                fresh_uid,
                count,
            })
            .await?;
        }

        Commands::Order { cmd } => match cmd {
            OrderCmd::Get { order_uid } => {
                let cfg = commands::load_cli_config(&cli.config_paths)?;
                commands::order::order_get(&cfg, &order_uid).await?;
            }
        },
    }

    Ok(())
}
