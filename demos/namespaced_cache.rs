//! # Namespaced Cache Example
//!
//! Two subsystems share one redb file without stepping on each other's keys.
//!
//! ## What This Example Shows
//!
//! - Opening a store from a connection URL (the store owns the connection)
//! - Sharing one backend handle between namespaces (borrowed handles)
//! - Batched writes with a uniform TTL
//! - Scanning keys by prefix
//!
//! ## Running This Example
//!
//! ```bash
//! cargo run --example namespaced_cache
//! ```

use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use nskv::{BackendClient, NamespacedStore, RedbBackend};

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== nskv Namespaced Cache Example ===\n");

    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("example.redb");

    // =========================================================================
    // Part 1: A store that owns its connection
    // =========================================================================

    println!("--- Part 1: Store built from a URL ---\n");

    let results = NamespacedStore::builder()
        .url(format!("redb://{}", db_path.display()))
        .namespace("results")
        .ttl_seconds(3600)
        .build()
        .await?;

    results
        .set_many([("job:1", "ok"), ("job:2", "failed"), ("report", "")])
        .await?;

    let values = results.get_many(&["job:1", "job:3", "report"]).await?;
    for (key, value) in ["job:1", "job:3", "report"].iter().zip(values) {
        match value {
            Some(bytes) => println!("  {key} = {:?}", String::from_utf8_lossy(&bytes)),
            None => println!("  {key} is absent"),
        }
    }

    let jobs = results.scan_keys(Some("job:")).collect_keys().await?;
    println!("  job keys: {jobs:?}");

    // Closing releases the redb file so it can be opened again below.
    results.close().await?;

    // =========================================================================
    // Part 2: Sharing one handle between namespaces
    // =========================================================================

    println!("\n--- Part 2: Shared handle, separate namespaces ---\n");

    let backend: Arc<dyn BackendClient> = Arc::new(RedbBackend::open(&db_path)?);
    let sessions = NamespacedStore::new(backend.clone(), "sessions", Some(1800))?;
    let results = NamespacedStore::new(backend.clone(), "results", None)?;

    sessions.set_many([("job:1", "session data")]).await?;

    let from_results = results.get_many(&["job:1"]).await?;
    let from_sessions = sessions.get_many(&["job:1"]).await?;
    println!(
        "  results/job:1 = {:?}",
        from_results[0].as_deref().map(String::from_utf8_lossy)
    );
    println!(
        "  sessions/job:1 = {:?}",
        from_sessions[0].as_deref().map(String::from_utf8_lossy)
    );

    // Borrowed handles are not closed by the stores; the caller closes them.
    sessions.close().await?;
    results.close().await?;
    backend.close().await?;

    println!("\n=== Example Complete ===");
    Ok(())
}
