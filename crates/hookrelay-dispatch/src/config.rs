//! Forwarder configuration with defaults, file, and environment overrides.
//!
//! All settings are static and supplied at construction. [`ForwarderConfig`]
//! works out of the box with production defaults; create `hookrelay.toml`
//! or set `HOOKRELAY_`-prefixed environment variables to override.

use anyhow::Context;
use chrono::Duration as ChronoDuration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hookrelay_core::{RelayError, Result};
use serde::{Deserialize, Serialize};

use crate::circuit::CircuitPolicy;

const CONFIG_FILE: &str = "hookrelay.toml";
const ENV_PREFIX: &str = "HOOKRELAY_";

/// Upper bound on configured time spans, one year in seconds.
///
/// Keeps TTL and reset-window arithmetic comfortably inside the range
/// `chrono` supports for durations and datetime addition.
pub(crate) const MAX_SCHEDULE_SECONDS: u64 = 366 * 24 * 60 * 60;

/// Converts whole seconds to a `chrono` duration without panicking.
///
/// `chrono::Duration::seconds` asserts on values past its internal range;
/// out-of-range input is clamped to [`MAX_SCHEDULE_SECONDS`] instead.
pub(crate) fn clamped_seconds(value: u64) -> ChronoDuration {
    let secs = i64::try_from(value.min(MAX_SCHEDULE_SECONDS)).unwrap_or(i64::MAX);
    ChronoDuration::try_seconds(secs).unwrap_or_else(ChronoDuration::zero)
}

/// Static configuration for the forwarding dispatcher.
///
/// Loaded in priority order: environment variables, then `hookrelay.toml`,
/// then built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Shared secret gating registry mutations.
    ///
    /// A value shorter than 16 bytes disables forwarding entirely.
    ///
    /// Environment variable: `HOOKRELAY_SHARED_SECRET`
    #[serde(default)]
    pub shared_secret: String,

    /// TTL applied when a registration omits one, in seconds.
    ///
    /// Environment variable: `HOOKRELAY_DEFAULT_TTL_SECONDS`
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// Upper bound on any requested TTL, in seconds.
    ///
    /// Environment variable: `HOOKRELAY_MAX_TTL_SECONDS`
    #[serde(default = "default_max_ttl_seconds")]
    pub max_ttl_seconds: u64,

    /// Consecutive failures that open a target's circuit.
    ///
    /// Environment variable: `HOOKRELAY_CIRCUIT_BREAKER_THRESHOLD`
    #[serde(default = "default_circuit_threshold")]
    pub circuit_breaker_threshold: u32,

    /// Seconds an open circuit waits before granting a half-open probe.
    ///
    /// Environment variable: `HOOKRELAY_CIRCUIT_RESET_SECONDS`
    #[serde(default = "default_circuit_reset_seconds")]
    pub circuit_reset_seconds: u64,

    /// Per-delivery timeout in milliseconds. A timeout counts as a failure.
    ///
    /// Environment variable: `HOOKRELAY_FORWARD_TIMEOUT_MS`
    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,

    /// Strict upper bound on live registrations.
    ///
    /// Environment variable: `HOOKRELAY_MAX_TARGETS`
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// Interval between expiry sweeps, in seconds.
    ///
    /// Environment variable: `HOOKRELAY_SWEEP_INTERVAL_SECONDS`
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// User agent sent on forwarded requests.
    ///
    /// Environment variable: `HOOKRELAY_USER_AGENT`
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ForwarderConfig {
    /// Loads configuration from defaults, `hookrelay.toml`, and `HOOKRELAY_`
    /// environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().context("failed to load forwarder configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates static configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_seconds == 0 {
            return Err(RelayError::configuration("default_ttl_seconds must be greater than 0"));
        }

        if self.max_ttl_seconds < self.default_ttl_seconds {
            return Err(RelayError::configuration(
                "max_ttl_seconds cannot be less than default_ttl_seconds",
            ));
        }

        if self.max_ttl_seconds > MAX_SCHEDULE_SECONDS {
            return Err(RelayError::configuration("max_ttl_seconds cannot exceed one year"));
        }

        if self.circuit_reset_seconds > MAX_SCHEDULE_SECONDS {
            return Err(RelayError::configuration("circuit_reset_seconds cannot exceed one year"));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(RelayError::configuration(
                "circuit_breaker_threshold must be greater than 0",
            ));
        }

        if self.forward_timeout_ms == 0 {
            return Err(RelayError::configuration("forward_timeout_ms must be greater than 0"));
        }

        if self.max_targets == 0 {
            return Err(RelayError::configuration("max_targets must be greater than 0"));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(RelayError::configuration(
                "sweep_interval_seconds must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Per-delivery timeout as a standard duration.
    pub fn forward_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.forward_timeout_ms)
    }

    /// Sweep interval as a standard duration.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Circuit breaker policy derived from the configured thresholds.
    pub fn circuit_policy(&self) -> CircuitPolicy {
        CircuitPolicy::new(
            self.circuit_breaker_threshold,
            clamped_seconds(self.circuit_reset_seconds),
        )
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            default_ttl_seconds: default_ttl_seconds(),
            max_ttl_seconds: default_max_ttl_seconds(),
            circuit_breaker_threshold: default_circuit_threshold(),
            circuit_reset_seconds: default_circuit_reset_seconds(),
            forward_timeout_ms: default_forward_timeout_ms(),
            max_targets: default_max_targets(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    1800
}

fn default_max_ttl_seconds() -> u64 {
    14400
}

fn default_circuit_threshold() -> u32 {
    5
}

fn default_circuit_reset_seconds() -> u64 {
    60
}

fn default_forward_timeout_ms() -> u64 {
    5000
}

fn default_max_targets() -> usize {
    5
}

fn default_sweep_interval_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Hookrelay-Forwarder/1.0".to_string()
}
