use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logserver::api::{self, AppState};
use logserver::config;
use logserver::store::{
    self, LogStore, MemoryLogStore, MemoryUserStore, PgLogStore, PgUserStore, ReservedAdmin,
    UserStore,
};

#[derive(Parser)]
#[command(name = "logserver", about = "Collect and query structured log records over REST")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config/server.toml")]
    config_path: PathBuf,

    /// Use the in-memory store instead of PostgreSQL
    #[arg(long)]
    memory: bool,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logserver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = config::load_config(&cli.config_path)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let admin = ReservedAdmin::synthesize(&config.admin)?;
    let policy = config.password_policy()?;

    let (users, logs): (Arc<dyn UserStore>, Arc<dyn LogStore>) = if cli.memory {
        (
            Arc::new(MemoryUserStore::new(admin, policy)),
            Arc::new(MemoryLogStore::new(config.logs.max_records)),
        )
    } else {
        let pool = store::postgres::connect(&config.database).await?;
        (
            Arc::new(PgUserStore::new(pool.clone(), admin, policy)),
            Arc::new(PgLogStore::new(pool, config.logs.max_records)),
        )
    };

    let state = AppState::new(&config, users, logs);
    api::run_server(&config, state).await?;

    Ok(())
}
