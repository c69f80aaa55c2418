//! Driver registry mapping driver identifiers to device factories.
//!
//! Platform drivers and test stubs are ordinary registrants, so adding a
//! driver never grows a hard-coded dispatch chain. Resolution is a pure
//! function of the driver name, its configuration and the registered
//! entries: it constructs a device without opening it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DriverConfig, WatchdogConfig};
use crate::device::{NullWatchdog, WatchdogDevice};
use crate::software::SoftwareWatchdog;

/// Factory constructing an unopened device from driver-specific parameters.
pub type DeviceFactory =
    Arc<dyn Fn(&DriverConfig) -> Box<dyn WatchdogDevice> + Send + Sync>;

/// Registry of watchdog device factories keyed by driver identifier.
pub struct DriverRegistry {
    factories: HashMap<String, DeviceFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in `software` driver registered.
    ///
    /// The platform driver is expected to register itself under
    /// `default` (or a platform-specific name) before the manager is
    /// constructed.
    #[must_use]
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        registry.register("software", |config| {
            Box::new(SoftwareWatchdog::from_config(config))
        });
        registry
    }

    /// Register a factory under a driver identifier.
    ///
    /// Replaces any previous registration for the same identifier.
    pub fn register(
        &mut self,
        driver: impl Into<String>,
        factory: impl Fn(&DriverConfig) -> Box<dyn WatchdogDevice> + Send + Sync + 'static,
    ) {
        self.factories.insert(driver.into(), Arc::new(factory));
    }

    /// Whether a driver identifier has a registered factory.
    #[must_use]
    pub fn is_registered(&self, driver: &str) -> bool {
        self.factories.contains_key(driver)
    }

    /// Construct (without opening) the device for a driver identifier.
    ///
    /// Returns [`NullWatchdog`] when the identifier resolves to no viable
    /// implementation on this platform.
    #[must_use]
    pub fn resolve(&self, driver: &str, config: &DriverConfig) -> Box<dyn WatchdogDevice> {
        match self.factories.get(driver) {
            Some(factory) => factory(config),
            None => Box::new(NullWatchdog),
        }
    }

    /// Construct the device selected by a configuration snapshot.
    #[must_use]
    pub fn select_device(&self, config: &WatchdogConfig) -> Box<dyn WatchdogDevice> {
        self.resolve(&config.driver, &config.driver_config)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtin_drivers()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut drivers: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        drivers.sort_unstable();
        f.debug_struct("DriverRegistry")
            .field("drivers", &drivers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_driver_resolves_to_null() {
        let registry = DriverRegistry::with_builtin_drivers();
        let device = registry.resolve("default", &DriverConfig::new());
        assert!(device.is_null());
    }

    #[test]
    fn test_builtin_software_driver() {
        let registry = DriverRegistry::with_builtin_drivers();
        assert!(registry.is_registered("software"));

        let device = registry.resolve("software", &DriverConfig::new());
        assert!(!device.is_null());
        assert!(device.is_healthy());
        assert!(!device.is_running());
    }

    #[test]
    fn test_registration_replaces_previous_entry() {
        let mut registry = DriverRegistry::new();
        registry.register("default", |_| Box::new(NullWatchdog));
        registry.register("default", |config| {
            Box::new(SoftwareWatchdog::from_config(config))
        });

        let device = registry.resolve("default", &DriverConfig::new());
        assert!(!device.is_null());
    }

    #[test]
    fn test_debug_lists_drivers() {
        let registry = DriverRegistry::with_builtin_drivers();
        let rendered = format!("{registry:?}");
        assert!(rendered.contains("software"));
    }
}
