//! Watchdog device contract and the null fallback implementation.
//!
//! A watchdog device, once opened, requires periodic calls to
//! [`WatchdogDevice::keepalive`]. When no keepalive arrives within the
//! device timeout the platform resets or halts the machine.

use crate::error::{WatchdogError, WatchdogResult};

/// Timeout reported by [`NullWatchdog`], in seconds.
///
/// Large enough that no safety comparison against a real timeout ever
/// treats the null device as constraining.
pub const NULL_TIMEOUT: i64 = 1_000_000_000;

/// Capability contract every watchdog implementation must satisfy.
///
/// Each open device corresponds to exactly one underlying kernel or
/// hardware resource. Ownership is exclusive: the manager holds at most
/// one device at a time and closes the previous one before constructing
/// a replacement.
///
/// # State machine
///
/// ```text
/// Constructed ──open()──► Running
///      ▲                     │
///      │        keepalive()  │ set_timeout()
///      │                     ▼
///      └──────close()──── Running
/// ```
///
/// Callers must not call `open()` twice without an intervening `close()`;
/// idempotence of `open()` is not guaranteed.
pub trait WatchdogDevice: Send {
    /// Acquire the underlying resource and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchdogError`] if the resource is unavailable, already
    /// held elsewhere, or misconfigured.
    fn open(&mut self) -> WatchdogResult<()>;

    /// Release the resource, best effort.
    ///
    /// Never fails from the caller's perspective and is safe to call on a
    /// device that was never opened.
    fn close(&mut self);

    /// Reset the device's internal countdown.
    ///
    /// Must only be called while the device is open.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchdogError`] if the reset could not be delivered.
    fn keepalive(&mut self) -> WatchdogResult<()>;

    /// Current timeout in effect on the device, in seconds.
    ///
    /// Meaningful even before configuring, reflecting the platform default.
    fn get_timeout(&self) -> i64;

    /// Whether [`WatchdogDevice::set_timeout`] has any effect.
    fn has_configurable_timeout(&self) -> bool {
        false
    }

    /// Request a new timeout, in seconds.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchdogError`] if the device cannot honor the request.
    fn set_timeout(&mut self, timeout: i64) -> WatchdogResult<()> {
        let _ = timeout;
        Err(WatchdogError::set_timeout_not_supported(self.describe()))
    }

    /// True only while the device is open and actively counting down.
    fn is_running(&self) -> bool {
        false
    }

    /// True if a future [`WatchdogDevice::open`] is expected to succeed.
    ///
    /// Used to assess configuration validity before arming is required.
    fn is_healthy(&self) -> bool {
        false
    }

    /// True if [`WatchdogDevice::close`] actually stops the countdown.
    ///
    /// Some hardware, once armed, cannot be stopped by software and will
    /// fire regardless.
    fn can_be_disabled(&self) -> bool {
        true
    }

    /// Human-readable identifier for logging.
    fn describe(&self) -> &str;

    /// True for the no-op fallback device only.
    fn is_null(&self) -> bool {
        false
    }
}

/// No-op implementation used when no real watchdog is available.
///
/// All mutating operations succeed without doing anything, so degraded
/// operation never has to special-case the missing device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWatchdog;

impl WatchdogDevice for NullWatchdog {
    fn open(&mut self) -> WatchdogResult<()> {
        Ok(())
    }

    fn close(&mut self) {}

    fn keepalive(&mut self) -> WatchdogResult<()> {
        Ok(())
    }

    fn get_timeout(&self) -> i64 {
        NULL_TIMEOUT
    }

    fn describe(&self) -> &str {
        "NullWatchdog"
    }

    fn is_null(&self) -> bool {
        true
    }
}
