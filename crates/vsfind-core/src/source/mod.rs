/// Read-only interfaces to the two discovery mechanisms.
///
/// - [`ConfigStore`] / [`ConfigKey`] — the hierarchical configuration store
///   (the Windows registry) used by older product generations.
/// - [`SetupQuery`] and friends — the setup-query service used by newer
///   generations, which hands out one opaque instance handle at a time.
///
/// Handles are owned values. Dropping one releases the underlying OS
/// resource, so every scope that opens a handle also closes it, including
/// early returns and `?` paths.
///
/// The Windows implementations live in [`crate::platform`]; [`memory`]
/// provides in-process implementations for tests and non-Windows hosts.
pub mod memory;

use crate::error::SourceError;

/// An open key in the configuration store.
pub trait ConfigKey: Sized {
    /// Names of the immediate child keys.
    fn subkey_names(&self) -> Result<Vec<String>, SourceError>;

    /// Open a (possibly nested, `\`-separated) child key.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    fn open_subkey(&self, path: &str) -> Result<Option<Self>, SourceError>;

    /// Read a string value. Returns `Ok(None)` when the value does not exist.
    fn string_value(&self, name: &str) -> Result<Option<String>, SourceError>;

    /// Whether a child key exists. The probe handle is released immediately.
    fn has_subkey(&self, name: &str) -> Result<bool, SourceError> {
        Ok(self.open_subkey(name)?.is_some())
    }
}

/// Entry point into the configuration store.
pub trait ConfigStore {
    type Key: ConfigKey;

    /// Open a machine-scope key by path. `Ok(None)` if it does not exist.
    fn open(&self, path: &str) -> Result<Option<Self::Key>, SourceError>;
}

/// String-keyed property bag attached to a setup instance.
pub trait PropertyStore {
    fn names(&self) -> Result<Vec<String>, SourceError>;

    fn value(&self, name: &str) -> Result<Option<String>, SourceError>;
}

/// One installation handle produced by the setup-query service.
pub trait SetupInstance {
    type Properties: PropertyStore;

    fn instance_id(&self) -> Result<String, SourceError>;

    /// Absolute installation root.
    fn installation_path(&self) -> Result<String, SourceError>;

    /// Main executable, relative to the installation root.
    fn product_path(&self) -> Result<String, SourceError>;

    fn installation_version(&self) -> Result<String, SourceError>;

    /// Dotted product identifier, e.g. `Microsoft.VisualStudio.Product.Community`.
    fn product_id(&self) -> Result<String, SourceError>;

    fn display_name(&self, lcid: u32) -> Result<String, SourceError>;

    /// Prerelease flag from the catalog capability.
    ///
    /// `Ok(None)` when the handle does not expose that capability.
    fn prerelease(&self) -> Result<Option<bool>, SourceError>;

    /// Attached property bag, if any.
    fn properties(&self) -> Result<Option<Self::Properties>, SourceError>;
}

/// Cursor over setup instances, fetched one at a time.
pub trait InstanceEnumerator {
    type Instance: SetupInstance;

    /// Next handle, or `Ok(None)` once the service is exhausted.
    fn next_instance(&mut self) -> Result<Option<Self::Instance>, SourceError>;
}

/// Entry point into the setup-query service.
pub trait SetupQuery {
    type Instances: InstanceEnumerator;

    /// Start an enumeration.
    ///
    /// Fails with [`SourceError::NotRegistered`] when the service is not
    /// installed on this machine.
    fn enum_instances(&self) -> Result<Self::Instances, SourceError>;
}
