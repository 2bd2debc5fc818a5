//! Target registry with TTL tracking and bounded-capacity eviction.
//!
//! Owns the set of registered forwarding targets behind a single async
//! mutex. The lock is held only for map reads and writes, never across an
//! outbound network call: the dispatcher snapshots eligible targets under
//! the lock and records outcomes one at a time afterwards.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use hookrelay_core::{Clock, ForwardingTarget, Registration, RelayError, Result, TargetId};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::{
    circuit::CircuitPolicy,
    client::masked_url,
    config::{clamped_seconds, ForwarderConfig},
    secret::SecretValidator,
};

/// Why a target was removed to make room for a new registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The target's TTL had already lapsed.
    Expired,
    /// The target's circuit breaker was open.
    CircuitOpen,
    /// Oldest registration, no better candidate available.
    Oldest,
}

impl EvictionReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::CircuitOpen => "circuit_open",
            Self::Oldest => "oldest",
        }
    }
}

/// A target snapshot handed to the delivery cycle.
///
/// Owned copy of the fields a delivery needs, so no lock is held while the
/// outbound request is in flight.
#[derive(Debug, Clone)]
pub struct EligibleTarget {
    /// Id of the snapshotted target.
    pub id: TargetId,
    /// Destination URL.
    pub url: Url,
}

/// Registry of forwarding targets with TTL, capacity, and circuit state.
///
/// All mutating operations are gated by the shared secret. The registry
/// never exceeds `max_targets` live entries: registration at capacity
/// evicts exactly one existing target, preferring already-expired entries,
/// then open-circuit entries, then the oldest registration.
#[derive(Debug)]
pub struct TargetRegistry {
    targets: Mutex<HashMap<TargetId, ForwardingTarget>>,
    secret: SecretValidator,
    policy: CircuitPolicy,
    default_ttl_seconds: u64,
    max_ttl_seconds: u64,
    max_targets: usize,
    clock: Arc<dyn Clock>,
}

impl TargetRegistry {
    /// Creates a registry from the forwarder configuration.
    pub fn new(config: &ForwarderConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            targets: Mutex::new(HashMap::new()),
            secret: SecretValidator::new(config.shared_secret.clone()),
            policy: config.circuit_policy(),
            default_ttl_seconds: config.default_ttl_seconds,
            max_ttl_seconds: config.max_ttl_seconds,
            max_targets: config.max_targets,
            clock,
        }
    }

    /// Whether forwarding is enabled (configured secret long enough).
    pub fn is_enabled(&self) -> bool {
        self.secret.is_enabled()
    }

    /// Registers a new forwarding target.
    ///
    /// Validates the secret and URL, resolves the TTL against the
    /// configured bounds, evicts one entry if the registry is at capacity,
    /// and inserts a fresh target with a closed circuit.
    pub async fn register(
        &self,
        secret: &str,
        url: &str,
        ttl_seconds: Option<u64>,
        description: Option<String>,
    ) -> Result<Registration> {
        if !self.secret.validate(secret) {
            return Err(RelayError::Auth);
        }

        let url = parse_target_url(url)?;
        let ttl = self.resolve_ttl(ttl_seconds)?;
        let now = self.clock.now();

        let mut targets = self.targets.lock().await;

        if targets.len() >= self.max_targets {
            let (victim_id, reason) = choose_eviction(&targets, now)
                .ok_or_else(|| RelayError::capacity(self.max_targets))?;
            targets.remove(&victim_id);
            info!(
                target_id = %victim_id,
                reason = reason.as_str(),
                "evicted forwarding target to make room"
            );
        }

        let target = ForwardingTarget::new(url, now, now + ttl, description);
        let registration = Registration { id: target.id, expires_at: target.expires_at };

        info!(
            target_id = %target.id,
            url = %masked_url(&target.url),
            expires_at = %target.expires_at,
            "registered forwarding target"
        );
        targets.insert(target.id, target);

        Ok(registration)
    }

    /// Extends a target's TTL and clears its failure state.
    ///
    /// The new expiry is computed from *now* with the same cap as
    /// registration, not cumulatively. A heartbeat is an explicit signal
    /// that the endpoint is alive, so an open circuit is closed and the
    /// failure count reset.
    pub async fn renew(
        &self,
        secret: &str,
        id: TargetId,
        ttl_seconds: Option<u64>,
    ) -> Result<Registration> {
        if !self.secret.validate(secret) {
            return Err(RelayError::Auth);
        }

        let ttl = self.resolve_ttl(ttl_seconds)?;
        let now = self.clock.now();

        let mut targets = self.targets.lock().await;
        let target = targets.get_mut(&id).ok_or_else(|| RelayError::not_found(id))?;

        target.expires_at = now + ttl;
        self.policy.reset(target);

        debug!(target_id = %id, expires_at = %target.expires_at, "renewed forwarding target");
        Ok(Registration { id, expires_at: target.expires_at })
    }

    /// Removes a target. Returns whether an entry existed.
    pub async fn deregister(&self, secret: &str, id: TargetId) -> Result<bool> {
        if !self.secret.validate(secret) {
            return Err(RelayError::Auth);
        }

        let removed = self.targets.lock().await.remove(&id).is_some();
        if removed {
            info!(target_id = %id, "deregistered forwarding target");
        }
        Ok(removed)
    }

    /// All targets whose TTL has not lapsed, regardless of circuit state.
    ///
    /// Used for status reporting; circuit filtering is the dispatcher's
    /// concern.
    pub async fn list_active(&self) -> Vec<ForwardingTarget> {
        let now = self.clock.now();
        let targets = self.targets.lock().await;
        targets.values().filter(|t| !t.is_expired(now)).cloned().collect()
    }

    /// Removes every target whose TTL has lapsed. Returns the count removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut targets = self.targets.lock().await;

        let before = targets.len();
        targets.retain(|_, t| !t.is_expired(now));
        before - targets.len()
    }

    /// Snapshots the targets eligible for delivery at this instant.
    ///
    /// Filters out expired targets and applies the circuit breaker, which
    /// may perform the open-to-half-open flip as a side effect. Running the
    /// eligibility check and the flip under the registry lock makes them a
    /// single atomic step, so a concurrent cycle cannot double-grant or
    /// lose the probe's counter rewind.
    pub async fn snapshot_eligible(&self) -> Vec<EligibleTarget> {
        let now = self.clock.now();
        let mut targets = self.targets.lock().await;

        targets
            .values_mut()
            .filter(|t| !t.is_expired(now))
            .filter_map(|t| {
                self.policy
                    .is_eligible(t, now)
                    .then(|| EligibleTarget { id: t.id, url: t.url.clone() })
            })
            .collect()
    }

    /// Records a successful delivery outcome for a target.
    ///
    /// A missing id means the target was evicted or expired while the
    /// delivery was in flight; the outcome is dropped.
    pub async fn record_success(&self, id: TargetId) {
        let now = self.clock.now();
        let mut targets = self.targets.lock().await;
        match targets.get_mut(&id) {
            Some(target) => self.policy.record_success(target, now),
            None => debug!(target_id = %id, "success outcome for removed target, dropping"),
        }
    }

    /// Records a failed delivery outcome for a target.
    pub async fn record_failure(&self, id: TargetId) {
        let now = self.clock.now();
        let mut targets = self.targets.lock().await;
        match targets.get_mut(&id) {
            Some(target) => self.policy.record_failure(target, now),
            None => debug!(target_id = %id, "failure outcome for removed target, dropping"),
        }
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.targets.lock().await.len()
    }

    /// Whether the registry holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.targets.lock().await.is_empty()
    }

    /// Resolves a requested TTL against the configured default and cap.
    ///
    /// The cap is applied to the raw seconds value, so an arbitrarily large
    /// request resolves to `max_ttl_seconds` rather than overflowing the
    /// duration arithmetic downstream.
    fn resolve_ttl(&self, requested: Option<u64>) -> Result<Duration> {
        if requested == Some(0) {
            return Err(RelayError::validation("ttl_seconds must be greater than zero"));
        }

        let secs = requested.unwrap_or(self.default_ttl_seconds).min(self.max_ttl_seconds);
        Ok(clamped_seconds(secs))
    }
}

/// Picks the single target to evict when the registry is at capacity.
///
/// Priority: any already-expired target (oldest expiry first), else any
/// open-circuit target (oldest registration first), else the oldest
/// registration outright. Returns `None` only for an empty map.
fn choose_eviction(
    targets: &HashMap<TargetId, ForwardingTarget>,
    now: DateTime<Utc>,
) -> Option<(TargetId, EvictionReason)> {
    if let Some(t) = targets.values().filter(|t| t.is_expired(now)).min_by_key(|t| t.expires_at) {
        return Some((t.id, EvictionReason::Expired));
    }

    if let Some(t) = targets.values().filter(|t| t.circuit_open).min_by_key(|t| t.registered_at) {
        return Some((t.id, EvictionReason::CircuitOpen));
    }

    targets.values().min_by_key(|t| t.registered_at).map(|t| (t.id, EvictionReason::Oldest))
}

/// Parses and validates a registration URL as absolute http or https.
fn parse_target_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| RelayError::validation(format!("invalid target url: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => {
            Err(RelayError::validation(format!("unsupported url scheme: {scheme}")))
        },
    }
}
