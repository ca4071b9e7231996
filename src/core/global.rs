//! # Process-wide default bus.
//!
//! A convenience for applications that want one shared bus without threading a
//! handle through every component. Independent instances built with
//! [`EventBus::builder`] stay fully supported and never touch this one.

use once_cell::sync::OnceCell;

use super::bus::EventBus;
use super::config::BusConfig;
use crate::error::BusError;

static DEFAULT: OnceCell<EventBus> = OnceCell::new();

impl EventBus {
    /// Returns the process-wide bus, building it with [`BusConfig::default`] on first use.
    ///
    /// # Errors
    /// [`BusError::Spawn`] if its executors cannot be started. A later call retries.
    pub fn default_instance() -> Result<&'static EventBus, BusError> {
        DEFAULT.get_or_try_init(|| EventBus::builder(BusConfig::default()).build())
    }

    /// Installs `bus` as the process-wide bus.
    ///
    /// Fails, handing `bus` back, if a default bus already exists.
    pub fn init_default(bus: EventBus) -> Result<(), EventBus> {
        DEFAULT.set(bus)
    }
}
