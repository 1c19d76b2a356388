use tracing::info;

use crate::cli::Context;
use landshare::error::{LandshareError, Result};
use landshare::refresh::RefreshWorker;

pub async fn handle_refresh_command(ctx: &Context) -> Result<()> {
    println!("🔄 Syncing from the mirror...");
    let (parcels, trades, prices) = ctx.store.refresh_all().await;
    println!("✅ Synced");
    println!("   Parcels: {}", parcels.len());
    println!("   Trades: {}", trades.len());
    println!("   Prices: {}", prices.len());
    Ok(())
}

pub async fn handle_watch_command(ctx: &Context) -> Result<()> {
    ctx.store.refresh_all().await;
    let handle = RefreshWorker::spawn(
        ctx.store.clone(),
        ctx.config.refresh_interval(),
        ctx.config.local_watch_interval(),
    );

    println!(
        "👀 Watching {} (refresh every {}s, press Ctrl-C to stop)",
        ctx.store.local().root().display(),
        ctx.config.refresh_interval_secs
    );

    let result = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, stopping refresh worker");
    handle.shutdown().await;

    result.map_err(|e| LandshareError::Other(e.into()))
}
