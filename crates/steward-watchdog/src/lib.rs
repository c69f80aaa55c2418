//! # steward-watchdog
//!
//! Watchdog device management for safe leader-lease termination in Steward.
//!
//! A cluster-membership agent that holds a leader lease must guarantee the
//! host resets if the agent stops functioning before the lease expires.
//! This crate decides whether a watchdog device is available and usable,
//! sizes its timeout safely relative to the agent's own failure-detection
//! period, and reconciles configuration changes at runtime without ever
//! leaving the watchdog mis-armed or leaking an open device handle.
//!
//! ## Architecture
//!
//! - [`manager`] - The [`Watchdog`] facade owning the active device and
//!   all state-transition and safety-timeout logic
//! - [`device`] - The [`WatchdogDevice`] contract and the null fallback
//! - [`config`] - Immutable configuration snapshots and the timeout math
//! - [`registry`] - Driver-identifier to device-factory registry
//! - [`software`] - In-process emulator device
//! - [`error`] - Watchdog-specific error types
//!
//! ## Safety contract
//!
//! The device must never report a longer timeout than the agent's own
//! failure-detection period, and exactly one device is open at a time;
//! switching drivers closes the old device before constructing the new
//! one. All manager operations are serialized behind a single lock, so a
//! periodic liveness thread and a configuration-reload thread can call in
//! concurrently without observing torn state.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use steward_watchdog::prelude::*;
//!
//! let raw = json!({
//!     "ttl": 30,
//!     "loop_wait": 10,
//!     "watchdog": {"mode": "automatic", "driver": "software"},
//! });
//! let registry = Arc::new(DriverRegistry::with_builtin_drivers());
//! let watchdog = Watchdog::new(&raw, registry).expect("valid configuration");
//!
//! assert!(watchdog.activate());
//! watchdog.keepalive();
//! assert!(watchdog.is_running());
//! watchdog.disable();
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod device;
pub mod error;
pub mod manager;
pub mod registry;
pub mod software;

pub mod prelude;

pub use config::{DriverConfig, SAFETY_MARGIN_HALF_TTL, WatchdogConfig, WatchdogMode};
pub use device::{NULL_TIMEOUT, NullWatchdog, WatchdogDevice};
pub use error::{WatchdogError, WatchdogResult};
pub use manager::{ActivationOutcome, Watchdog};
pub use registry::{DeviceFactory, DriverRegistry};
pub use software::SoftwareWatchdog;
