// Gateway module for the HTTP server - follows the Train Station Pattern
// All external access must go through this gateway

mod error;
mod routes;
mod sse;

pub use error::ApiError;
pub use routes::{router, AppState, USER_HEADER};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::Config;
use crate::gateway::Gateway;
use crate::limits::RateLimiter;

/// Run the gateway over HTTP until interrupted
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let sweep_interval = Duration::from_secs(config.server.sweep_interval_secs.max(1));

    let gateway = Arc::new(Gateway::from_config(config).context("Failed to initialize gateway")?);
    let sweeper = spawn_sweeper(gateway.limiter(), sweep_interval);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("neural-bridge listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("neural-bridge stopped");
    Ok(())
}

/// Periodically drop rate-limit buckets with no recent requests
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let dropped = limiter.sweep();
            if dropped > 0 {
                debug!("Swept {} idle rate-limit buckets", dropped);
            }
        }
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
