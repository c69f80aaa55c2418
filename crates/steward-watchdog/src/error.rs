//! Error types for watchdog device management.

use thiserror::Error;

/// Errors that can occur while managing a watchdog device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchdogError {
    /// The underlying device rejected an operation or could not be reached.
    #[error("watchdog device error: {0}")]
    DeviceError(String),

    /// The device has a fixed timeout that cannot be reconfigured.
    #[error("setting timeout is not supported on {0}")]
    SetTimeoutNotSupported(String),

    /// The raw configuration is missing required keys or has wrong types.
    #[error("invalid watchdog configuration: {0}")]
    InvalidConfiguration(String),

    /// A watchdog is required but no driver resolves on this platform.
    ///
    /// Surfaced at construction time so the embedding process can refuse
    /// to start instead of running without its safety net.
    #[error("configuration requires a watchdog, but watchdog is not supported on this platform")]
    Unsupported,
}

impl WatchdogError {
    /// Create a device error with a human-readable cause.
    #[must_use]
    pub fn device_error(cause: impl Into<String>) -> Self {
        Self::DeviceError(cause.into())
    }

    /// Create a set-timeout-not-supported error for the named device.
    #[must_use]
    pub fn set_timeout_not_supported(device: impl Into<String>) -> Self {
        Self::SetTimeoutNotSupported(device.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatchdogError::device_error("device is busy");
        assert_eq!(err.to_string(), "watchdog device error: device is busy");

        let err = WatchdogError::set_timeout_not_supported("IPMI watchdog");
        assert!(err.to_string().contains("IPMI watchdog"));

        let err = WatchdogError::invalid_configuration("ttl must be an integer");
        assert!(err.to_string().contains("ttl must be an integer"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            WatchdogError::device_error("boom"),
            WatchdogError::DeviceError(_)
        ));
        assert!(matches!(
            WatchdogError::invalid_configuration("bad"),
            WatchdogError::InvalidConfiguration(_)
        ));
    }
}
