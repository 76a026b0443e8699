/// Platform-specific discovery sources.
///
/// On Windows the registry and the setup configuration COM service back the
/// two scanners. Other hosts have neither, so discovery there runs against
/// an empty store and a service that reports itself as not registered.

#[cfg(windows)]
#[allow(non_snake_case, dead_code)]
mod com;
#[cfg(windows)]
pub mod registry;
#[cfg(windows)]
pub mod setup_config;

#[cfg(windows)]
pub use registry::{RegistryKey, RegistryStore};
#[cfg(windows)]
pub use setup_config::SetupConfiguration;

/// Configuration store used by [`crate::discover`] on this host.
#[cfg(windows)]
pub type DefaultConfigStore = RegistryStore;
/// Setup-query service used by [`crate::discover`] on this host.
#[cfg(windows)]
pub type DefaultSetupQuery = SetupConfiguration;

#[cfg(not(windows))]
pub type DefaultConfigStore = crate::source::memory::MemoryConfigStore;
#[cfg(not(windows))]
pub type DefaultSetupQuery = crate::source::memory::MemorySetupQuery;

/// The sources [`crate::discover`] reads on this host.
#[cfg(windows)]
pub fn default_sources() -> (DefaultConfigStore, DefaultSetupQuery) {
    (RegistryStore::machine_32bit(), SetupConfiguration::new())
}

/// The sources [`crate::discover`] reads on this host.
#[cfg(not(windows))]
pub fn default_sources() -> (DefaultConfigStore, DefaultSetupQuery) {
    (
        crate::source::memory::MemoryConfigStore::new(),
        crate::source::memory::MemorySetupQuery::not_registered(),
    )
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::scanner::{discover_with, DiscoveryOptions};

    #[test]
    fn non_windows_sources_discover_nothing() {
        let (store, query) = default_sources();
        let found = discover_with(&store, &query, &DiscoveryOptions::default()).unwrap();
        assert!(found.is_empty());
    }
}
