//! CLI command implementations for nskv.
//!
//! - `get` - print values, `(nil)` for missing keys
//! - `set` - write KEY VALUE pairs in one batch
//! - `del` - delete keys in one batch
//! - `scan` - stream keys page by page

use anyhow::{Result, bail};
use futures::TryStreamExt;
use std::io::Write;
use std::pin::pin;

use nskv::NamespacedStore;

use crate::Commands;

/// Dispatch a parsed subcommand against an open store.
pub async fn run(store: &NamespacedStore, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Get { keys } => get(store, &keys, out).await,
        Commands::Set { pairs } => set(store, &pairs, out).await,
        Commands::Del { keys } => del(store, &keys, out).await,
        Commands::Scan { prefix } => scan(store, prefix.as_deref(), out).await,
    }
}

async fn get(store: &NamespacedStore, keys: &[String], out: &mut impl Write) -> Result<()> {
    let values = store.get_many(keys).await?;
    for (key, value) in keys.iter().zip(values) {
        match value {
            Some(bytes) => writeln!(out, "{key}\t{}", String::from_utf8_lossy(&bytes))?,
            None => writeln!(out, "{key}\t(nil)")?,
        }
    }
    Ok(())
}

async fn set(store: &NamespacedStore, pairs: &[String], out: &mut impl Write) -> Result<()> {
    if pairs.len() % 2 != 0 {
        bail!(
            "set expects KEY VALUE pairs, got {} arguments\n  \
             Example: nskv set user:1 alice user:2 bob",
            pairs.len()
        );
    }

    let entries: Vec<(&str, &str)> = pairs
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
        .collect();
    store.set_many(entries.iter().copied()).await?;
    writeln!(out, "OK ({} keys)", entries.len())?;
    Ok(())
}

async fn del(store: &NamespacedStore, keys: &[String], out: &mut impl Write) -> Result<()> {
    store.delete_many(keys).await?;
    writeln!(out, "OK ({} keys)", keys.len())?;
    Ok(())
}

async fn scan(store: &NamespacedStore, prefix: Option<&str>, out: &mut impl Write) -> Result<()> {
    let mut keys = pin!(store.scan_keys(prefix).into_stream());
    let mut count = 0usize;
    while let Some(key) = keys.try_next().await? {
        writeln!(out, "{key}")?;
        count += 1;
    }
    tracing::debug!(count, "Scan complete");
    Ok(())
}
