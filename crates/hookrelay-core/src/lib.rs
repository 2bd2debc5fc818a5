//! Core domain types for the hookrelay forwarding dispatcher.
//!
//! Provides strongly-typed identifiers, the forwarding target model, the
//! shared error taxonomy, and a clock abstraction for deterministic time
//! control in tests. The dispatch crate builds on these foundations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;

pub use error::{RelayError, Result};
pub use models::{ForwardingTarget, Registration, TargetId};
pub use time::{Clock, RealClock, TestClock};
