/// Scanner module — orchestrates instance discovery.
///
/// Two independent scanners cover different product generations:
/// - **Legacy:** registry keys, one installation per version (2015 and older).
/// - **Modern:** the setup configuration COM service, any number of
///   installations per version (2017 and newer).
///
/// Results are merged by instance identity, filtered by a minimum major
/// version and returned in total order as an immutable [`InstanceList`].
/// Discovery is synchronous and keeps no state between calls.
pub mod legacy;
pub mod modern;

use crate::error::DiscoveryError;
use crate::model::{Instance, InstanceKey};
use crate::platform;
use crate::source::{ConfigStore, SetupQuery};
use std::collections::HashMap;
use std::ops::Deref;
use tracing::info;

/// Oldest major version reported by default (Visual Studio 2015).
pub const DEFAULT_MINIMUM_MAJOR_VERSION: u32 = 14;

/// Knobs for a discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Instances whose major version is below this are dropped.
    pub minimum_major_version: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            minimum_major_version: DEFAULT_MINIMUM_MAJOR_VERSION,
        }
    }
}

/// Sorted, read-only discovery result.
#[derive(Debug, Clone, Default)]
pub struct InstanceList(Box<[Instance]>);

impl InstanceList {
    fn from_unsorted(mut instances: Vec<Instance>) -> Self {
        instances.sort_by(Instance::total_cmp);
        Self(instances.into_boxed_slice())
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.0
    }
}

impl Deref for InstanceList {
    type Target = [Instance];

    fn deref(&self) -> &[Instance] {
        &self.0
    }
}

impl IntoIterator for InstanceList {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

impl<'a> IntoIterator for &'a InstanceList {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Discover installed instances on this machine.
///
/// Uses the registry and the setup configuration service on Windows; on
/// other hosts both sources are empty.
pub fn discover(minimum_major_version: u32) -> Result<InstanceList, DiscoveryError> {
    let (store, query) = platform::default_sources();
    discover_with(
        &store,
        &query,
        &DiscoveryOptions {
            minimum_major_version,
        },
    )
}

/// Discover instances from explicit sources.
///
/// Fails only when an installation reports a malformed version or an
/// unknown edition; source failures degrade to fewer results.
pub fn discover_with<S, Q>(
    store: &S,
    query: &Q,
    options: &DiscoveryOptions,
) -> Result<InstanceList, DiscoveryError>
where
    S: ConfigStore,
    Q: SetupQuery,
{
    let mut merged: HashMap<InstanceKey, Instance> = HashMap::new();

    let legacy = legacy::scan(store);
    let legacy_count = legacy.len();
    for instance in legacy {
        merged.entry(instance.identity()).or_insert(instance);
    }

    let modern = modern::scan(query)?;
    let modern_count = modern.len();
    for instance in modern {
        merged.entry(instance.identity()).or_insert(instance);
    }

    let total = merged.len();
    let kept: Vec<Instance> = merged
        .into_values()
        .filter(|instance| instance.version().major >= options.minimum_major_version)
        .collect();

    info!(
        "Discovery complete: {legacy_count} registry + {modern_count} setup-query instances, \
         {total} unique, {} at major >= {}",
        kept.len(),
        options.minimum_major_version
    );

    Ok(InstanceList::from_unsorted(kept))
}
