//! `nskv` - inspect and edit a namespaced key-value store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use nskv::logging::{self, LogFormat};
use nskv::{NamespacedStore, StoreConfig};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "nskv", version)]
#[command(about = "Inspect and edit a namespaced key-value store")]
struct Cli {
    /// Backend URL (memory://, redb:///path/to/kv.redb)
    #[arg(long, global = true)]
    url: Option<String>,

    /// TOML config file with url/namespace/ttl_seconds/scan_page_size
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Namespace applied to every key
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Expiry in seconds for keys written by `set`
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the values of one or more keys
    Get {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Write one or more KEY VALUE pairs
    Set {
        #[arg(required = true, num_args = 2.., value_names = ["KEY", "VALUE"])]
        pairs: Vec<String>,
    },
    /// Delete one or more keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// List keys, optionally filtered by a prefix
    Scan {
        #[arg(short, long)]
        prefix: Option<String>,
    },
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides.
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load_from(path)?,
            None => StoreConfig::default(),
        };

        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.namespace.clone_from(namespace);
        }
        if let Some(ttl) = self.ttl {
            config.ttl_seconds = Some(ttl);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.log_level());

    let config = cli.store_config()?;
    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    let store = NamespacedStore::from_config(&config)
        .await
        .context("Failed to open store")?;

    let mut stdout = std::io::stdout().lock();
    let outcome = commands::run(&store, cli.command, &mut stdout).await;
    store.close().await.context("Failed to close store")?;
    outcome
}
