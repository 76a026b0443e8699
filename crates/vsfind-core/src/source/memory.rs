/// In-memory discovery sources.
///
/// Used by the test suites and as the default sources on hosts that have
/// neither a registry nor a setup-query service. Both sources count the
/// handles currently open so tests can check that every handle is released.
use super::{ConfigKey, ConfigStore, InstanceEnumerator, PropertyStore, SetupInstance, SetupQuery};
use crate::error::SourceError;
use crate::scanner::modern::LCID_EN_US;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Configuration store ─────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct KeyNode {
    /// Keyed by upper-cased name; the value keeps the original spelling.
    children: BTreeMap<String, (String, KeyNode)>,
    values: BTreeMap<String, String>,
}

impl KeyNode {
    fn child(&self, name: &str) -> Option<&KeyNode> {
        self.children.get(&name.to_uppercase()).map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> &mut KeyNode {
        &mut self
            .children
            .entry(name.to_uppercase())
            .or_insert_with(|| (name.to_string(), KeyNode::default()))
            .1
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|s| !s.is_empty())
}

fn fold_path<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    segments
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("\\")
}

/// Registry-shaped key tree.
///
/// Key and value names are matched case-insensitively, like the registry.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigStore {
    root: Arc<KeyNode>,
    open_handles: Arc<AtomicUsize>,
    enumerate_error: Option<SourceError>,
    /// Keyed by upper-cased `(key path, value name)`.
    value_errors: BTreeMap<(String, String), SourceError>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key (and any missing parents).
    pub fn with_key(mut self, path: &str) -> Self {
        let mut node = Arc::make_mut(&mut self.root);
        for segment in segments(path) {
            node = node.child_mut(segment);
        }
        self
    }

    /// Set a string value, creating the key if needed.
    pub fn with_value(mut self, path: &str, name: &str, value: &str) -> Self {
        let mut node = Arc::make_mut(&mut self.root);
        for segment in segments(path) {
            node = node.child_mut(segment);
        }
        node.values.insert(name.to_uppercase(), value.to_string());
        self
    }

    /// Make every child-key enumeration fail with `err`.
    pub fn with_enumerate_error(mut self, err: SourceError) -> Self {
        self.enumerate_error = Some(err);
        self
    }

    /// Make reads of value `name` under the key at `path` fail with `err`.
    pub fn with_value_error(mut self, path: &str, name: &str, err: SourceError) -> Self {
        self.value_errors.insert((fold_path(segments(path)), name.to_uppercase()), err);
        self
    }

    /// Number of keys opened and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    fn key(&self, path: Vec<String>) -> MemoryKey {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        MemoryKey {
            store: self.clone(),
            path,
        }
    }

    fn node(&self, path: &[String]) -> Option<&KeyNode> {
        path.iter()
            .try_fold(self.root.as_ref(), |node, name| node.child(name))
    }
}

impl ConfigStore for MemoryConfigStore {
    type Key = MemoryKey;

    fn open(&self, path: &str) -> Result<Option<MemoryKey>, SourceError> {
        let path: Vec<String> = segments(path).map(str::to_string).collect();
        Ok(self.node(&path).is_some().then(|| self.key(path)))
    }
}

/// Open handle into a [`MemoryConfigStore`].
#[derive(Debug)]
pub struct MemoryKey {
    store: MemoryConfigStore,
    path: Vec<String>,
}

impl MemoryKey {
    fn node(&self) -> Result<&KeyNode, SourceError> {
        self.store
            .node(&self.path)
            .ok_or_else(|| {
                SourceError::Unavailable(format!("key {} vanished", self.path.join("\\")))
            })
    }
}

impl ConfigKey for MemoryKey {
    fn subkey_names(&self) -> Result<Vec<String>, SourceError> {
        if let Some(err) = &self.store.enumerate_error {
            return Err(err.clone());
        }
        Ok(self
            .node()?
            .children
            .values()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn open_subkey(&self, path: &str) -> Result<Option<MemoryKey>, SourceError> {
        let mut full = self.path.clone();
        full.extend(segments(path).map(str::to_string));
        Ok(self.store.node(&full).is_some().then(|| self.store.key(full)))
    }

    fn string_value(&self, name: &str) -> Result<Option<String>, SourceError> {
        let key = (
            fold_path(self.path.iter().map(String::as_str)),
            name.to_uppercase(),
        );
        if let Some(err) = self.store.value_errors.get(&key) {
            return Err(err.clone());
        }
        Ok(self.node()?.values.get(&name.to_uppercase()).cloned())
    }
}

impl Drop for MemoryKey {
    fn drop(&mut self) {
        self.store.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Setup-query service ─────────────────────────────────────────────────────

/// Data behind one setup instance handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryInstance {
    pub instance_id: String,
    pub installation_path: String,
    pub product_path: String,
    pub installation_version: String,
    pub product_id: String,
    /// Returned for the US English locale only.
    pub display_name: String,
    /// `None` models a handle without the catalog capability.
    pub prerelease: Option<bool>,
    /// `None` models a handle without a property bag.
    pub properties: Option<BTreeMap<String, String>>,
    /// When set, every read on this handle fails with this error.
    pub read_error: Option<SourceError>,
}

impl MemoryInstance {
    fn read<T>(&self, value: impl FnOnce() -> T) -> Result<T, SourceError> {
        match &self.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(value()),
        }
    }
}

/// Handle returned by [`MemoryEnumerator`].
#[derive(Debug)]
pub struct MemoryInstanceHandle {
    data: MemoryInstance,
    open_handles: Arc<AtomicUsize>,
}

impl SetupInstance for MemoryInstanceHandle {
    type Properties = MemoryProperties;

    fn instance_id(&self) -> Result<String, SourceError> {
        self.data.read(|| self.data.instance_id.clone())
    }

    fn installation_path(&self) -> Result<String, SourceError> {
        self.data.read(|| self.data.installation_path.clone())
    }

    fn product_path(&self) -> Result<String, SourceError> {
        self.data.read(|| self.data.product_path.clone())
    }

    fn installation_version(&self) -> Result<String, SourceError> {
        self.data.read(|| self.data.installation_version.clone())
    }

    fn product_id(&self) -> Result<String, SourceError> {
        self.data.read(|| self.data.product_id.clone())
    }

    fn display_name(&self, lcid: u32) -> Result<String, SourceError> {
        if lcid != LCID_EN_US {
            return Err(SourceError::Unavailable(format!(
                "no display name for locale {lcid}"
            )));
        }
        self.data.read(|| self.data.display_name.clone())
    }

    fn prerelease(&self) -> Result<Option<bool>, SourceError> {
        self.data.read(|| self.data.prerelease)
    }

    fn properties(&self) -> Result<Option<MemoryProperties>, SourceError> {
        self.data
            .read(|| self.data.properties.clone().map(MemoryProperties))
    }
}

impl Drop for MemoryInstanceHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Property bag of a [`MemoryInstance`].
#[derive(Debug, Clone)]
pub struct MemoryProperties(BTreeMap<String, String>);

impl PropertyStore for MemoryProperties {
    fn names(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.0.keys().cloned().collect())
    }

    fn value(&self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.0.get(name).cloned())
    }
}

/// Scripted setup-query service.
#[derive(Debug, Clone, Default)]
pub struct MemorySetupQuery {
    instances: Vec<MemoryInstance>,
    start_error: Option<SourceError>,
    /// Fail `next_instance` with this error after yielding this many handles.
    fail_after: Option<(usize, SourceError)>,
    open_handles: Arc<AtomicUsize>,
}

impl MemorySetupQuery {
    pub fn new(instances: Vec<MemoryInstance>) -> Self {
        Self {
            instances,
            ..Self::default()
        }
    }

    /// A service that is not installed on this machine.
    pub fn not_registered() -> Self {
        Self::failing(SourceError::NotRegistered)
    }

    /// A service whose enumeration cannot be started.
    pub fn failing(err: SourceError) -> Self {
        Self {
            start_error: Some(err),
            ..Self::default()
        }
    }

    /// Fail with `err` once `count` handles have been yielded.
    pub fn with_failure_after(mut self, count: usize, err: SourceError) -> Self {
        self.fail_after = Some((count, err));
        self
    }

    /// Number of instance handles yielded and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl SetupQuery for MemorySetupQuery {
    type Instances = MemoryEnumerator;

    fn enum_instances(&self) -> Result<MemoryEnumerator, SourceError> {
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        Ok(MemoryEnumerator {
            query: self.clone(),
            position: 0,
        })
    }
}

/// Cursor over a [`MemorySetupQuery`].
#[derive(Debug)]
pub struct MemoryEnumerator {
    query: MemorySetupQuery,
    position: usize,
}

impl InstanceEnumerator for MemoryEnumerator {
    type Instance = MemoryInstanceHandle;

    fn next_instance(&mut self) -> Result<Option<MemoryInstanceHandle>, SourceError> {
        if let Some((count, err)) = &self.query.fail_after {
            if self.position >= *count {
                return Err(err.clone());
            }
        }

        let Some(data) = self.query.instances.get(self.position).cloned() else {
            return Ok(None);
        };
        self.position += 1;

        self.query.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Some(MemoryInstanceHandle {
            data,
            open_handles: Arc::clone(&self.query.open_handles),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let store = MemoryConfigStore::new().with_value(r"SOFTWARE\Vendor\1.0", "Path", "x");
        let root = store.open(r"software\VENDOR").unwrap().unwrap();
        assert_eq!(root.subkey_names().unwrap(), vec!["1.0".to_string()]);

        let child = root.open_subkey("1.0").unwrap().unwrap();
        assert_eq!(child.string_value("PATH").unwrap().as_deref(), Some("x"));
        assert_eq!(child.string_value("missing").unwrap(), None);
    }

    #[test]
    fn missing_keys_open_as_none() {
        let store = MemoryConfigStore::new().with_key(r"SOFTWARE\Vendor");
        assert!(store.open(r"SOFTWARE\Other").unwrap().is_none());
        let root = store.open(r"SOFTWARE\Vendor").unwrap().unwrap();
        assert!(!root.has_subkey("child").unwrap());
    }

    #[test]
    fn value_errors_hit_only_the_named_value() {
        let store = MemoryConfigStore::new()
            .with_value(r"SOFTWARE\Vendor", "Good", "x")
            .with_value(r"SOFTWARE\Vendor", "Bad", "y")
            .with_value_error(r"software\vendor", "bad", SourceError::Unavailable("io".into()));
        let key = store.open(r"SOFTWARE\Vendor").unwrap().unwrap();
        assert_eq!(key.string_value("Good").unwrap().as_deref(), Some("x"));
        assert_eq!(
            key.string_value("BAD"),
            Err(SourceError::Unavailable("io".into()))
        );
    }

    #[test]
    fn dropped_keys_release_their_handle() {
        let store = MemoryConfigStore::new().with_key(r"A\B");
        {
            let a = store.open("A").unwrap().unwrap();
            let _b = a.open_subkey("B").unwrap().unwrap();
            assert_eq!(store.open_handles(), 2);
        }
        assert_eq!(store.open_handles(), 0);
    }

    #[test]
    fn enumerator_drains_then_reports_exhaustion() {
        let query = MemorySetupQuery::new(vec![MemoryInstance::default(); 2]);
        let mut cursor = query.enum_instances().unwrap();
        assert!(cursor.next_instance().unwrap().is_some());
        assert!(cursor.next_instance().unwrap().is_some());
        assert!(cursor.next_instance().unwrap().is_none());
        assert_eq!(query.open_handles(), 0);
    }

    #[test]
    fn not_registered_fails_to_start() {
        let err = MemorySetupQuery::not_registered()
            .enum_instances()
            .unwrap_err();
        assert!(err.is_not_registered());
    }
}
