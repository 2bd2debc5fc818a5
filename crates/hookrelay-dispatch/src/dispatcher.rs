//! Fire-and-forget fan-out of webhook payloads to registered targets.
//!
//! The dispatcher is the surface the ingestion stage holds: [`Dispatcher::
//! forward`] spawns a delivery cycle and returns immediately, so the
//! production webhook path never waits on a secondary forwarding target.
//! Registration operations delegate to the registry; [`Dispatcher::status`]
//! reports operator-facing state with credentials masked.

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use hookrelay_core::{Clock, RealClock, Registration, Result, TargetId};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    client::{masked_url, passthrough_headers, ForwardClient},
    config::ForwarderConfig,
    registry::TargetRegistry,
};

/// Aggregate of one delivery cycle, for internal logging and tests only.
///
/// Never surfaced to the caller of `forward`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Targets that were eligible and attempted.
    pub attempted: usize,
    /// Attempts that returned 2xx.
    pub delivered: usize,
    /// Attempts that failed (non-2xx, timeout, or transport error).
    pub failed: usize,
}

/// Operator-facing status report.
#[derive(Debug, Clone, Serialize)]
pub struct ForwarderStatus {
    /// Whether forwarding is enabled (configured secret long enough).
    pub enabled: bool,
    /// Number of non-expired registrations.
    pub active_targets: usize,
    /// Per-target detail, credentials masked.
    pub targets: Vec<TargetReport>,
}

/// Status detail for a single target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    /// Target id.
    pub id: TargetId,
    /// Destination URL with any userinfo credentials masked.
    pub url: String,
    /// Seconds until the registration lapses.
    pub expires_in: u64,
    /// Consecutive delivery failures.
    pub failure_count: u32,
    /// Whether the circuit breaker is suppressing delivery.
    pub circuit_open: bool,
}

/// Webhook forwarding dispatcher.
///
/// Cheap to clone; clones share the registry and the pooled HTTP client.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<TargetRegistry>,
    client: ForwardClient,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Creates a dispatcher with the system clock.
    pub fn new(config: ForwarderConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(RealClock::new()))
    }

    /// Creates a dispatcher with an injected clock, for tests.
    pub fn with_clock(config: ForwarderConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(TargetRegistry::new(&config, clock.clone()));
        let client = ForwardClient::new(&config)?;

        if !registry.is_enabled() {
            warn!("forwarding disabled: configured shared secret is too short");
        }

        Ok(Self { registry, client, clock })
    }

    /// Shared handle to the underlying registry (sweeper wiring).
    pub fn registry(&self) -> Arc<TargetRegistry> {
        self.registry.clone()
    }

    /// Registers a forwarding target. See [`TargetRegistry::register`].
    pub async fn register(
        &self,
        secret: &str,
        url: &str,
        ttl_seconds: Option<u64>,
        description: Option<String>,
    ) -> Result<Registration> {
        self.registry.register(secret, url, ttl_seconds, description).await
    }

    /// Renews a forwarding target. See [`TargetRegistry::renew`].
    pub async fn renew(
        &self,
        secret: &str,
        id: TargetId,
        ttl_seconds: Option<u64>,
    ) -> Result<Registration> {
        self.registry.renew(secret, id, ttl_seconds).await
    }

    /// Deregisters a forwarding target. See [`TargetRegistry::deregister`].
    pub async fn deregister(&self, secret: &str, id: TargetId) -> Result<bool> {
        self.registry.deregister(secret, id).await
    }

    /// Fans a payload out to all eligible targets without blocking.
    ///
    /// Fire-and-forget by design: the cycle runs on a spawned task, and
    /// neither per-target failures nor the aggregate are surfaced to the
    /// caller. The caller-observable latency is independent of any
    /// target's response time.
    pub fn forward(&self, payload: Bytes, headers: HashMap<String, String>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.forward_cycle(payload, headers).await;
        });
    }

    /// Runs one complete delivery cycle and waits for every attempt.
    ///
    /// This is the body of [`Dispatcher::forward`]; it is public so an
    /// embedding service (or a test) can observe cycle completion. The
    /// snapshot of eligible targets is taken under the registry lock with
    /// a single `now`; deliveries then run as independent concurrent
    /// tasks, and each outcome is written back as it completes.
    pub async fn forward_cycle(
        &self,
        payload: Bytes,
        headers: HashMap<String, String>,
    ) -> CycleSummary {
        let candidates = self.registry.snapshot_eligible().await;
        if candidates.is_empty() {
            debug!("no eligible forwarding targets, skipping cycle");
            return CycleSummary::default();
        }

        let signature_headers = Arc::new(passthrough_headers(&headers));
        let mut attempts: Vec<(TargetId, JoinHandle<bool>)> =
            Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let registry = self.registry.clone();
            let client = self.client.clone();
            let payload = payload.clone();
            let signature_headers = signature_headers.clone();

            let target_id = candidate.id;
            attempts.push((
                target_id,
                tokio::spawn(async move {
                    let outcome = client
                        .deliver(candidate.id, &candidate.url, payload, &signature_headers)
                        .await;

                    if outcome.is_success() {
                        registry.record_success(candidate.id).await;
                        true
                    } else {
                        registry.record_failure(candidate.id).await;
                        false
                    }
                }),
            ));
        }

        let summary = self.collect_outcomes(attempts).await;

        debug!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "forward cycle finished"
        );
        summary
    }

    /// Waits for every delivery attempt and tallies the cycle summary.
    ///
    /// Each attempt records its own outcome before returning; a joined
    /// error means the task died before that write-back ran, so the failure
    /// is recorded here.
    async fn collect_outcomes(&self, attempts: Vec<(TargetId, JoinHandle<bool>)>) -> CycleSummary {
        let mut summary = CycleSummary { attempted: attempts.len(), ..CycleSummary::default() };
        for (target_id, attempt) in attempts {
            match attempt.await {
                Ok(true) => summary.delivered += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    self.registry.record_failure(target_id).await;
                    summary.failed += 1;
                    warn!(target_id = %target_id, error = %e, "forward attempt task panicked");
                },
            }
        }
        summary
    }

    /// Operator-facing status with masked URLs.
    pub async fn status(&self) -> ForwarderStatus {
        let now = self.clock.now();
        let mut active = self.registry.list_active().await;
        active.sort_by_key(|t| t.registered_at);

        let targets = active
            .iter()
            .map(|t| TargetReport {
                id: t.id,
                url: masked_url(&t.url),
                expires_in: t.expires_in_seconds(now),
                failure_count: t.failure_count,
                circuit_open: t.circuit_open,
            })
            .collect();

        ForwarderStatus {
            enabled: self.registry.is_enabled(),
            active_targets: active.len(),
            targets,
        }
    }
}
