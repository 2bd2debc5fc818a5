//! Per-target circuit breaker logic.
//!
//! Unlike a shared breaker table, the state here lives inside each
//! [`ForwardingTarget`]: the breaker is created and destroyed with the
//! registration it protects. This module owns the transition rules; the
//! registry applies them under its lock so the eligibility check and the
//! half-open flip are a single atomic step.
//!
//! # State machine
//!
//! ```text
//!            failure_count reaches threshold
//!  ┌────────┐ ─────────────────────────────▶ ┌──────┐
//!  │ closed │                                │ open │
//!  └────────┘ ◀───────────────────────────── └──────┘
//!     ▲  │      success, or renew heartbeat     │
//!     │  │                                      │ reset window elapsed
//!     │  │                                      ▼
//!     │  │    probe granted (one delivery)  ┌───────────┐
//!     │  └─────────────────────────────────▶│ half-open │ (derived, not
//!     └─────────────────────────────────────└───────────┘  stored)
//!        probe success closes; probe failure re-opens immediately
//! ```
//!
//! Half-open is not a stored state. When the reset window has elapsed the
//! eligibility check flips `circuit_open` to false and rewinds
//! `failure_count` to `threshold - 1` before the probe is dispatched, so a
//! single further failure re-opens the circuit while a success resets it
//! through the normal success path.

use chrono::{DateTime, Duration, Utc};
use hookrelay_core::ForwardingTarget;
use tracing::{debug, info};

/// Transition thresholds for the embedded circuit breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitPolicy {
    /// Consecutive failures that open the circuit.
    pub threshold: u32,
    /// How long an open circuit waits before granting a half-open probe.
    pub reset_window: Duration,
}

impl CircuitPolicy {
    /// Creates a policy from the configured threshold and reset window.
    pub fn new(threshold: u32, reset_window: Duration) -> Self {
        Self { threshold, reset_window }
    }

    /// Whether the target may receive a delivery at `now`.
    ///
    /// A closed circuit is always eligible. An open circuit past its reset
    /// window is granted exactly one probe: the call flips the circuit
    /// closed and rewinds the failure count as a side effect, so the caller
    /// must hold the registry lock.
    pub fn is_eligible(&self, target: &mut ForwardingTarget, now: DateTime<Utc>) -> bool {
        if !target.circuit_open {
            return true;
        }

        let opened_at = match target.circuit_opened_at {
            Some(opened_at) => opened_at,
            // circuit_open without a timestamp should not happen; repair by
            // treating the window as elapsed.
            None => return self.grant_probe(target),
        };

        if now.signed_duration_since(opened_at) >= self.reset_window {
            return self.grant_probe(target);
        }

        false
    }

    /// Records a successful delivery: counters reset, circuit closed.
    pub fn record_success(&self, target: &mut ForwardingTarget, now: DateTime<Utc>) {
        if target.circuit_open {
            info!(target_id = %target.id, "forwarding target recovered, closing circuit");
        }

        target.failure_count = 0;
        target.last_success_at = Some(now);
        target.circuit_open = false;
        target.circuit_opened_at = None;
    }

    /// Records a failed delivery, opening the circuit at the threshold.
    pub fn record_failure(&self, target: &mut ForwardingTarget, now: DateTime<Utc>) {
        target.failure_count = target.failure_count.saturating_add(1);
        target.last_failure_at = Some(now);

        if target.failure_count >= self.threshold && !target.circuit_open {
            target.circuit_open = true;
            target.circuit_opened_at = Some(now);
            info!(
                target_id = %target.id,
                failure_count = target.failure_count,
                "circuit opened for forwarding target"
            );
        }
    }

    /// Explicit reset via renewal: a heartbeat overrides the breaker.
    pub fn reset(&self, target: &mut ForwardingTarget) {
        if target.circuit_open {
            info!(target_id = %target.id, "renewal heartbeat, closing circuit");
        }

        target.failure_count = 0;
        target.circuit_open = false;
        target.circuit_opened_at = None;
    }

    fn grant_probe(&self, target: &mut ForwardingTarget) -> bool {
        debug!(target_id = %target.id, "reset window elapsed, granting half-open probe");

        target.circuit_open = false;
        target.circuit_opened_at = None;
        target.failure_count = self.threshold.saturating_sub(1);
        true
    }
}
