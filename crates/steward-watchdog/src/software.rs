//! Software watchdog emulator.
//!
//! An in-process implementation of [`WatchdogDevice`] for deployments
//! without platform watchdog hardware and for exercising the manager in
//! tests. It keeps the full device contract, including keepalive failures
//! when the device is not open, but resetting its countdown has no effect
//! on the machine.

use std::time::Instant;

use crate::config::DriverConfig;
use crate::device::WatchdogDevice;
use crate::error::{WatchdogError, WatchdogResult};

/// Default timeout when the driver configuration does not set one, seconds.
const DEFAULT_TIMEOUT: i64 = 60;

/// Software-based watchdog device.
///
/// Recognized driver configuration keys:
///
/// - `timeout` — initial timeout in seconds (default 60)
/// - `can_be_disabled` — report non-stoppable hardware when `false`
///   (default `true`)
#[derive(Debug)]
pub struct SoftwareWatchdog {
    timeout: i64,
    can_be_disabled: bool,
    open: bool,
    last_keepalive: Option<Instant>,
    keepalive_count: u64,
}

impl SoftwareWatchdog {
    /// Create an emulator with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            can_be_disabled: true,
            open: false,
            last_keepalive: None,
            keepalive_count: 0,
        }
    }

    /// Create an emulator from driver-specific configuration.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        let mut device = Self::new();
        if let Some(timeout) = config.get("timeout").and_then(serde_json::Value::as_i64) {
            device.timeout = timeout;
        }
        if let Some(flag) = config.get("can_be_disabled").and_then(serde_json::Value::as_bool) {
            device.can_be_disabled = flag;
        }
        device
    }

    /// Number of keepalives delivered since the device was constructed.
    #[must_use]
    pub fn keepalive_count(&self) -> u64 {
        self.keepalive_count
    }

    /// Time of the most recent keepalive, if any.
    #[must_use]
    pub fn last_keepalive(&self) -> Option<Instant> {
        self.last_keepalive
    }
}

impl Default for SoftwareWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchdogDevice for SoftwareWatchdog {
    fn open(&mut self) -> WatchdogResult<()> {
        if self.open {
            return Err(WatchdogError::device_error(
                "software watchdog is already open",
            ));
        }
        self.open = true;
        self.last_keepalive = Some(Instant::now());
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.last_keepalive = None;
    }

    fn keepalive(&mut self) -> WatchdogResult<()> {
        if !self.open {
            return Err(WatchdogError::device_error(
                "software watchdog is not open",
            ));
        }
        self.last_keepalive = Some(Instant::now());
        self.keepalive_count += 1;
        Ok(())
    }

    fn get_timeout(&self) -> i64 {
        self.timeout
    }

    fn has_configurable_timeout(&self) -> bool {
        true
    }

    fn set_timeout(&mut self, timeout: i64) -> WatchdogResult<()> {
        if timeout <= 0 {
            return Err(WatchdogError::device_error(format!(
                "timeout {timeout} is not positive"
            )));
        }
        self.timeout = timeout;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.open
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn can_be_disabled(&self) -> bool {
        self.can_be_disabled
    }

    fn describe(&self) -> &str {
        "Software watchdog emulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn driver_config(value: serde_json::Value) -> DriverConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_open_close_cycle() {
        let mut device = SoftwareWatchdog::new();
        assert!(!device.is_running());

        device.open().expect("open succeeds");
        assert!(device.is_running());

        assert!(device.open().is_err());

        device.close();
        assert!(!device.is_running());

        // Closing again is harmless.
        device.close();
    }

    #[test]
    fn test_keepalive_requires_open() {
        let mut device = SoftwareWatchdog::new();
        assert!(device.keepalive().is_err());

        device.open().expect("open succeeds");
        device.keepalive().expect("keepalive succeeds while open");
        assert_eq!(device.keepalive_count(), 1);
        assert!(device.last_keepalive().is_some());
    }

    #[test]
    fn test_timeout_configuration() {
        let mut device = SoftwareWatchdog::new();
        assert!(device.has_configurable_timeout());
        assert_eq!(device.get_timeout(), 60);

        device.set_timeout(25).expect("positive timeout accepted");
        assert_eq!(device.get_timeout(), 25);

        assert!(device.set_timeout(0).is_err());
    }

    #[test]
    fn test_from_config() {
        let device = SoftwareWatchdog::from_config(&driver_config(json!({
            "timeout": 5,
            "can_be_disabled": false,
        })));

        assert_eq!(device.get_timeout(), 5);
        assert!(!device.can_be_disabled());
        assert!(device.is_healthy());
    }
}
