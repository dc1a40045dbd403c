//! Retention commands: one-shot sweep and the sweeper daemon.

use anyhow::{Context, Result};
use std::time::Duration;

use capstore::config::RetentionConfig;
use capstore::storage::Sweeper;

/// Sweep expired entries and compact orphans once, printing both reports.
pub fn once(sweeper: &Sweeper, ttl: Duration) -> Result<()> {
    let swept = sweeper.sweep_now(ttl)?;
    let compacted = sweeper.compact()?;

    let json = serde_json::json!({
        "swept": swept,
        "compacted": compacted,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Sweep every `sweep_interval_secs` until Ctrl-C.
pub async fn daemon(sweeper: &Sweeper, retention: &RetentionConfig) -> Result<()> {
    let handle = sweeper
        .clone()
        .spawn(retention.sweep_interval(), retention.ttl());

    tracing::info!("Sweeper running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    handle.stop().await;
    Ok(())
}
