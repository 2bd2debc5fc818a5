//! Background eviction of expired forwarding targets.
//!
//! A periodic task that removes lapsed registrations regardless of
//! delivery activity, so no target stays deliverable more than one sweep
//! interval past its expiry. Sweeping shares the registry lock with
//! registration and forwarding; a sweep racing with a snapshot may let one
//! delivery go to a target that expires microseconds later, but never
//! removes a still-active target.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::TargetRegistry;

/// Periodic TTL sweeper for the target registry.
#[derive(Debug)]
pub struct ExpirySweeper {
    registry: Arc<TargetRegistry>,
    interval: std::time::Duration,
    cancellation_token: CancellationToken,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given registry.
    pub fn new(
        registry: Arc<TargetRegistry>,
        interval: std::time::Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { registry, interval, cancellation_token }
    }

    /// Spawns the sweep loop.
    ///
    /// Runs until the cancellation token fires; the returned handle
    /// completes once the loop has observed cancellation headroom for a
    /// graceful shutdown.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; consume it so the first
            // sweep happens one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.registry.sweep_expired().await;
                        if removed > 0 {
                            info!(removed, "swept expired forwarding targets");
                        } else {
                            debug!("sweep found no expired targets");
                        }
                    }
                    () = self.cancellation_token.cancelled() => {
                        info!("expiry sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}
