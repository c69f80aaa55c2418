//! Prelude for steward-watchdog.
//!
//! Re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use steward_watchdog::prelude::*;
//!
//! let registry = DriverRegistry::with_builtin_drivers();
//! assert!(registry.is_registered("software"));
//! ```

pub use crate::config::{DriverConfig, WatchdogConfig, WatchdogMode};
pub use crate::device::{NullWatchdog, WatchdogDevice};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::manager::{ActivationOutcome, Watchdog};
pub use crate::registry::DriverRegistry;
pub use crate::software::SoftwareWatchdog;
