//! Watchdog lifecycle manager.
//!
//! [`Watchdog`] is the facade the rest of the agent talks to. It owns the
//! currently active device, computes safe timeout values, arbitrates
//! between operating modes and reconciles configuration changes without
//! ever leaving the watchdog mis-armed, silently disabled when required,
//! or leaking an open device handle.
//!
//! When activation fails the underlying device is switched to the null
//! implementation. To avoid log spam, activation is only retried when the
//! watchdog configuration changes.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::{WatchdogConfig, WatchdogMode};
use crate::device::{NullWatchdog, WatchdogDevice};
use crate::error::{WatchdogError, WatchdogResult};
use crate::registry::DriverRegistry;

/// Result of one run of the activation sequence.
///
/// `activate()` collapses this to a boolean for callers, but the explicit
/// outcome keeps every degrade/fail branch independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Device is open and counting down with a safe timeout.
    Armed,
    /// Watchdog was requested but could not be safely armed; the agent
    /// keeps running on the null device.
    ArmedDegraded,
    /// Mode is [`WatchdogMode::Required`] and no safe watchdog could be
    /// armed. The caller is expected to treat this as fatal.
    FailedRequired,
}

struct Inner {
    /// Latest snapshot received via reload; may differ from what is armed.
    config: WatchdogConfig,
    /// Snapshot in effect the last time the device was (re)armed.
    active_config: WatchdogConfig,
    /// Whether the agent intends the watchdog to be armed.
    active: bool,
    /// Currently owned device, never unset (at least the null device).
    device: Box<dyn WatchdogDevice>,
    registry: Arc<DriverRegistry>,
}

impl Inner {
    /// Close the current device, then install a replacement.
    ///
    /// Close-before-construct ordering avoids two simultaneously open
    /// handles to the same physical watchdog.
    fn install(&mut self, device: Box<dyn WatchdogDevice>) {
        self.device.close();
        self.device = device;
    }

    /// Re-select the device from the latest snapshot.
    fn select_device(&mut self) {
        self.device.close();
        self.device = self.registry.select_device(&self.config);
    }

    /// Open the device and bring its timeout in line with the snapshot.
    ///
    /// Returns the timeout actually in effect, or `None` when the device
    /// had to be dropped because its floor timeout cannot survive a single
    /// keepalive interval.
    fn open_and_configure(&mut self) -> WatchdogResult<Option<i64>> {
        self.device.open()?;
        if self.device.has_configurable_timeout() {
            self.device.set_timeout(self.config.timeout())?;
        }

        // Safety check for devices that do not support configurable
        // timeouts: the effective timeout must outlast one loop_wait.
        let actual_timeout = self.device.get_timeout();
        if self.device.is_running() && actual_timeout < self.config.loop_wait {
            tracing::error!(
                loop_wait = self.config.loop_wait,
                timeout = actual_timeout,
                device = %self.device.describe(),
                "loop_wait is too long for the watchdog timeout"
            );
            if self.device.can_be_disabled() {
                tracing::info!("disabling watchdog due to unsafe timeout");
                self.install(Box::new(NullWatchdog));
                return Ok(None);
            }
        }
        Ok(Some(actual_timeout))
    }

    /// Run the activation sequence against the latest snapshot.
    fn activate(&mut self) -> ActivationOutcome {
        self.active_config = self.config.clone();

        if self.config.timing_slack() < 0 {
            tracing::warn!(
                ttl = self.config.ttl,
                loop_wait = self.config.loop_wait,
                "watchdog not supported because the TTL leaves no slack over loop_wait"
            );
            self.install(Box::new(NullWatchdog));
        }

        let actual_timeout = match self.open_and_configure() {
            Ok(actual_timeout) => actual_timeout,
            Err(error) => {
                let device = self.device.describe().to_owned();
                if self.config.mode == WatchdogMode::Required {
                    tracing::warn!(device = %device, error = %error, "could not activate watchdog");
                } else {
                    tracing::debug!(device = %device, error = %error, "could not activate watchdog");
                }
                self.install(Box::new(NullWatchdog));
                Some(self.device.get_timeout())
            }
        };

        if self.device.is_running() && !self.device.can_be_disabled() {
            tracing::warn!(
                device = %self.device.describe(),
                "watchdog implementation cannot be disabled; it will fire after the agent loses its lease"
            );
        }

        let safely_armed = self.device.is_running()
            && actual_timeout.is_none_or(|actual| actual <= self.config.timeout());
        if !safely_armed {
            if self.config.mode == WatchdogMode::Required {
                if self.device.is_null() {
                    tracing::error!(
                        "configuration requires a watchdog, but the watchdog could not be configured"
                    );
                } else {
                    tracing::error!(
                        requested = self.config.timeout(),
                        actual = actual_timeout,
                        "configuration requires a watchdog, but a safe timeout could not be configured"
                    );
                }
                return ActivationOutcome::FailedRequired;
            }
            if !self.device.is_null() {
                tracing::warn!(
                    actual = actual_timeout,
                    limit = self.config.timeout(),
                    "watchdog timeout does not ensure safe termination within the lease TTL"
                );
            }
        }

        if self.device.is_running() {
            tracing::info!(
                device = %self.device.describe(),
                timeout = actual_timeout,
                timing_slack = self.config.timing_slack(),
                "watchdog activated"
            );
            ActivationOutcome::Armed
        } else if self.config.mode == WatchdogMode::Required {
            tracing::error!(
                "configuration requires a watchdog, but the watchdog could not be activated"
            );
            ActivationOutcome::FailedRequired
        } else {
            ActivationOutcome::ArmedDegraded
        }
    }

    /// Stop the countdown as far as the hardware allows and close the device.
    fn shutdown_device(&mut self) {
        if self.device.is_running() && !self.device.can_be_disabled() {
            // Grant maximal grace time before the unavoidable reset.
            if let Err(error) = self.device.keepalive() {
                tracing::error!(error = %error, "error while sending final keepalive");
            }
            tracing::warn!(
                timeout = self.device.get_timeout(),
                "watchdog implementation cannot be disabled; the system will reboot when the timeout elapses"
            );
        }
        self.device.close();
    }

    /// Apply pending configuration changes at keepalive time.
    ///
    /// The branches mirror the activation contract: a mode transition out
    /// of `Off` or a driver change re-runs the full activation sequence;
    /// a bare timeout change is applied to the open device in place.
    fn reconcile(&mut self) {
        if self.config.mode != WatchdogMode::Off && self.active_config.mode == WatchdogMode::Off {
            self.select_device();
            let _ = self.activate();
        }
        if self.config.driver != self.active_config.driver
            || self.config.driver_config != self.active_config.driver_config
        {
            self.shutdown_device();
            self.select_device();
            let _ = self.activate();
        }
        if self.config.timeout() != self.active_config.timeout() {
            match self.device.set_timeout(self.config.timeout()) {
                Ok(()) => {
                    if self.device.is_running() {
                        tracing::info!(
                            device = %self.device.describe(),
                            timeout = self.device.get_timeout(),
                            timing_slack = self.config.timing_slack(),
                            "watchdog timeout updated"
                        );
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "error while updating watchdog timeout");
                }
            }
        }
        self.active_config = self.config.clone();
    }
}

/// Facade that manages watchdog devices and handles configuration changes.
///
/// All public operations are serialized behind a single mutex, so no two
/// state transitions interleave and no caller observes a torn state. Call
/// frequency is bounded by the keepalive interval (seconds), so the
/// coarse-grained lock trades throughput for correctness.
pub struct Watchdog {
    inner: Mutex<Inner>,
}

impl Watchdog {
    /// Build a manager from the raw agent configuration.
    ///
    /// The device for the configured driver is selected (but not opened)
    /// immediately so configuration problems surface before activation.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidConfiguration`] if the raw mapping
    /// is malformed, or [`WatchdogError::Unsupported`] when the mode is
    /// [`WatchdogMode::Required`] and no driver resolves on this platform;
    /// the caller is expected to treat the latter as a startup failure.
    pub fn new(raw: &Value, registry: Arc<DriverRegistry>) -> WatchdogResult<Self> {
        let config = WatchdogConfig::from_value(raw)?;

        let device: Box<dyn WatchdogDevice> = if config.mode == WatchdogMode::Off {
            Box::new(NullWatchdog)
        } else {
            registry.select_device(&config)
        };
        if config.mode == WatchdogMode::Required && device.is_null() {
            return Err(WatchdogError::Unsupported);
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                active_config: config.clone(),
                config,
                active: false,
                device,
                registry,
            }),
        })
    }

    /// Activate the watchdog device with suitable timeouts.
    ///
    /// While the watchdog is active, [`Watchdog::keepalive`] needs to be
    /// called every time `loop_wait` expires.
    ///
    /// Returns `false` if a safe watchdog could not be configured but is
    /// required; `true` otherwise, including the degraded automatic-mode
    /// case.
    pub fn activate(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.active = true;
        inner.activate() != ActivationOutcome::FailedRequired
    }

    /// Reset the device countdown and apply any pending config changes.
    ///
    /// Keepalive failures are logged and never propagated: a failing
    /// watchdog must not crash the liveness loop it protects.
    pub fn keepalive(&self) {
        let mut inner = self.inner.lock();
        if inner.active {
            if let Err(error) = inner.device.keepalive() {
                tracing::error!(error = %error, "error while sending keepalive");
            }
            // Apply any configuration changes that arrived mid-cycle.
            if inner.config != inner.active_config {
                inner.reconcile();
            }
        }
    }

    /// Replace the configuration snapshot with one built from `raw`.
    ///
    /// Turning the watchdog off is always applied immediately. While the
    /// watchdog is active, other changes are deferred to the next
    /// keepalive so the armed timeout window stays aligned with the
    /// agent's own liveness period; while inactive, driver changes are
    /// applied immediately so problems surface in logs early.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidConfiguration`] if the raw mapping
    /// is malformed; the previous snapshot stays in effect.
    pub fn reload_config(&self, raw: &Value) -> WatchdogResult<()> {
        let config = WatchdogConfig::from_value(raw)?;

        let mut inner = self.inner.lock();
        inner.config = config;
        // Turning a watchdog off can always be done immediately.
        if inner.config.mode == WatchdogMode::Off {
            if inner.active {
                inner.shutdown_device();
            }
            inner.active_config = inner.config.clone();
            inner.install(Box::new(NullWatchdog));
        }
        if !inner.active {
            if inner.config.driver != inner.active_config.driver
                || inner.config.driver_config != inner.active_config.driver_config
            {
                inner.select_device();
            }
            inner.active_config = inner.config.clone();
        }
        Ok(())
    }

    /// Disarm and close the device as far as the hardware allows.
    ///
    /// A device that cannot be disabled receives one final keepalive for
    /// maximal grace time and is still closed best-effort. Calling this
    /// twice is harmless.
    pub fn disable(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown_device();
        inner.active = false;
    }

    /// Whether the device is open and actively counting down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().device.is_running()
    }

    /// Whether the current configuration can be armed when needed.
    ///
    /// Always true outside [`WatchdogMode::Required`]; in required mode,
    /// true iff the timing slack is non-negative and the device reports
    /// healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        let inner = self.inner.lock();
        if inner.config.mode != WatchdogMode::Required {
            return true;
        }
        inner.config.timing_slack() >= 0 && inner.device.is_healthy()
    }

    /// Whether the manager is currently holding the null device.
    #[must_use]
    pub fn is_null_device(&self) -> bool {
        self.inner.lock().device.is_null()
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Watchdog")
            .field("active", &inner.active)
            .field("driver", &inner.config.driver)
            .field("device", &inner.device.describe())
            .finish()
    }
}
