//! Forwarding target model and strongly-typed identifiers.
//!
//! A [`ForwardingTarget`] is one registered delivery endpoint with its TTL
//! bookkeeping and embedded circuit breaker state. Identity is carried by
//! the [`TargetId`] newtype to keep target ids from mixing with other UUIDs
//! at compile time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Strongly-typed forwarding target identifier.
///
/// Assigned at registration time and immutable for the lifetime of the
/// target. Unique across all live targets in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub Uuid);

impl TargetId {
    /// Creates a new random target id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TargetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// One registered webhook forwarding endpoint.
///
/// Created by `register`, extended by `renew`, mutated by delivery
/// outcomes, and removed by `deregister`, TTL sweep, or capacity eviction.
/// The circuit breaker state is embedded rather than held in a separate
/// table: the breaker is per-target and dies with the registration.
#[derive(Debug, Clone)]
pub struct ForwardingTarget {
    /// Unique id assigned at registration. Immutable.
    pub id: TargetId,
    /// Destination endpoint. Validated http/https at registration. Immutable.
    pub url: Url,
    /// Creation timestamp. Immutable; drives oldest-first eviction.
    pub registered_at: DateTime<Utc>,
    /// Expiry deadline. Advanced by renewal; governs delivery eligibility
    /// and sweeping.
    pub expires_at: DateTime<Utc>,
    /// Optional free-text label. Immutable.
    pub description: Option<String>,
    /// Consecutive delivery failures. Reset on success or renewal.
    pub failure_count: u32,
    /// Timestamp of the most recent successful delivery. Informational.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent failed delivery. Informational.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Whether the circuit breaker is suppressing delivery.
    pub circuit_open: bool,
    /// When the circuit last opened; drives the half-open retry window.
    pub circuit_opened_at: Option<DateTime<Utc>>,
}

impl ForwardingTarget {
    /// Creates a fresh target with a closed circuit and zeroed counters.
    pub fn new(
        url: Url,
        registered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: TargetId::new(),
            url,
            registered_at,
            expires_at,
            description,
            failure_count: 0,
            last_success_at: None,
            last_failure_at: None,
            circuit_open: false,
            circuit_opened_at: None,
        }
    }

    /// Whether the registration has lapsed at the given instant.
    ///
    /// An expired target must never receive a delivery and is removed at
    /// the next sweep.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Seconds until expiry, saturating at zero once lapsed.
    pub fn expires_in_seconds(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.expires_at.signed_duration_since(now).num_seconds();
        u64::try_from(remaining).unwrap_or(0)
    }
}

/// Result of a successful `register` or `renew` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Id of the created or renewed target.
    pub id: TargetId,
    /// The (re)computed expiry deadline.
    pub expires_at: DateTime<Utc>,
}
