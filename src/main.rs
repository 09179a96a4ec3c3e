//! Leaderboard Server
//!
//! Serves score updates and rank queries over a line protocol. See
//! `leaderboard::config` for the environment variables it reads.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use leaderboard::observability::init_tracing;
use leaderboard::{CacheJanitor, DrainTask, LeaderboardConfig, LeaderboardServer, LeaderboardService};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LeaderboardConfig::load()?;
    init_tracing(config.log_format);

    info!(
        bind_addr = %config.bind_addr,
        max_level = config.max_level,
        promotion_probability = config.promotion_probability,
        drain_interval_ms = config.drain_interval_ms,
        cache_ttl_ms = config.cache_ttl_ms,
        "starting leaderboard server"
    );

    let service = LeaderboardService::new(&config);
    let cancel = CancellationToken::new();

    let drain = DrainTask::new(service.batcher().clone(), config.drain_interval()).spawn(cancel.clone());
    let janitor = CacheJanitor::new(service.cache().clone(), config.cache_ttl()).spawn(cancel.clone());

    let server = LeaderboardServer::bind(&config.bind_addr, service.clone()).await?;
    let server_task = tokio::spawn(server.run(cancel.clone()));

    signal::ctrl_c().await?;
    info!("Shutdown requested");
    cancel.cancel();

    match server_task.await {
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
        Ok(Ok(())) => {}
    }
    // Final drain runs inside the task before it returns
    drain.await?;
    janitor.await?;

    info!(customers = service.len(), "leaderboard server stopped");
    Ok(())
}
