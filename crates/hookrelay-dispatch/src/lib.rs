//! Webhook forwarding dispatcher.
//!
//! Accepts time-bounded registrations of remote endpoints, fans incoming
//! webhook payloads out to them without blocking the caller, and suppresses
//! delivery to failing endpoints with a per-target circuit breaker.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  forward()   ┌──────────────────┐   POST    ┌────────────┐
//! │ Ingestion      │─────────────▶│ Dispatcher       │──────────▶│ Registered │
//! │ stage          │ (no await)   │ (spawned cycle)  │ (N tasks) │ targets    │
//! └────────────────┘              └──────────────────┘           └────────────┘
//!                                        │  ▲
//!                               snapshot │  │ outcomes
//!                                        ▼  │
//! ┌────────────────┐  register    ┌──────────────────┐   tick    ┌────────────┐
//! │ Registration   │─────────────▶│ TargetRegistry   │◀──────────│ Expiry     │
//! │ callers        │ renew/dereg  │ (TTL + breaker)  │  sweep    │ sweeper    │
//! └────────────────┘              └──────────────────┘           └────────────┘
//! ```
//!
//! The registry's target map is guarded by a single mutex held only for
//! map reads and writes, never across an outbound request. `forward`
//! snapshots the eligible targets under the lock, releases it, delivers
//! concurrently with one task per target, and re-acquires the lock only to
//! record each outcome.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use bytes::Bytes;
//! use hookrelay_dispatch::{Dispatcher, ForwarderConfig};
//!
//! # async fn example() -> hookrelay_core::Result<()> {
//! let config = ForwarderConfig {
//!     shared_secret: "a-long-shared-secret-value".into(),
//!     ..ForwarderConfig::default()
//! };
//! let dispatcher = Dispatcher::new(config)?;
//!
//! let registration = dispatcher
//!     .register("a-long-shared-secret-value", "https://dev.example.com/hook", None, None)
//!     .await?;
//! println!("target {} expires {}", registration.id, registration.expires_at);
//!
//! // Fire-and-forget: returns before any delivery completes.
//! dispatcher.forward(Bytes::from_static(b"{}"), HashMap::new());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod registry;
pub mod secret;
pub mod sweeper;

pub use circuit::CircuitPolicy;
pub use client::{DeliveryOutcome, ForwardClient};
pub use config::ForwarderConfig;
pub use dispatcher::{CycleSummary, Dispatcher, ForwarderStatus, TargetReport};
pub use registry::TargetRegistry;
pub use secret::SecretValidator;
pub use sweeper::ExpirySweeper;
