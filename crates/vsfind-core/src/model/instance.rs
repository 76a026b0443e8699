/// A single discovered installation.
///
/// Instances are built once by a scanner and never modified. Identity is the
/// pair (product directory, root suffix) compared case-insensitively; the
/// version, display name and edition play no part in equality or hashing.
///
/// Ordering is total across a discovery result: version first, then product
/// directory, then root suffix (both case-insensitive).
use crate::model::{Edition, Version};
use serde::Serialize;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Separator appended to product directories and used when joining paths.
pub const PATH_SEPARATOR: char = '\\';

/// Major version of Visual Studio 2015.
pub const VS2015_MAJOR: u32 = 14;
/// Major version of Visual Studio 2017.
pub const VS2017_MAJOR: u32 = 15;
/// Major version of Visual Studio 2019.
pub const VS2019_MAJOR: u32 = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    version: Version,
    display_name: String,
    edition: Edition,
    product_directory: String,
    environment_directory: String,
    environment_path: String,
    is_prerelease: bool,
    nickname: String,
    id: String,
    root_suffix: String,
}

/// Every field needed to construct an [`Instance`].
///
/// Optional string fields default to `""`.
#[derive(Debug, Clone, Default)]
pub struct InstanceParts {
    pub display_name: String,
    pub product_directory: String,
    pub environment_directory: String,
    pub environment_path: String,
    pub is_prerelease: bool,
    pub nickname: String,
    pub id: String,
    pub root_suffix: String,
}

impl Instance {
    /// Build an instance, normalizing the product directory so it always
    /// ends with a path separator.
    pub fn new(version: Version, edition: Edition, parts: InstanceParts) -> Self {
        Self {
            version,
            display_name: parts.display_name,
            edition,
            product_directory: with_trailing_separator(parts.product_directory),
            environment_directory: parts.environment_directory,
            environment_path: parts.environment_path,
            is_prerelease: parts.is_prerelease,
            nickname: parts.nickname,
            id: parts.id,
            root_suffix: parts.root_suffix,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    /// Installation root, always ending with a separator.
    pub fn product_directory(&self) -> &str {
        &self.product_directory
    }

    /// Directory containing the main executable.
    pub fn environment_directory(&self) -> &str {
        &self.environment_directory
    }

    /// Full path to the main executable.
    pub fn environment_path(&self) -> &str {
        &self.environment_path
    }

    pub fn is_prerelease(&self) -> bool {
        self.is_prerelease
    }

    /// Install-time nickname, `""` when none was given.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Setup instance id; `""` for registry-discovered instances.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Experimental hive suffix; `""` unless one applies.
    pub fn root_suffix(&self) -> &str {
        &self.root_suffix
    }

    pub fn is_vs2015(&self) -> bool {
        self.version.major == VS2015_MAJOR
    }

    pub fn is_vs2017(&self) -> bool {
        self.version.major == VS2017_MAJOR
    }

    pub fn is_vs2019(&self) -> bool {
        self.version.major == VS2019_MAJOR
    }

    /// Case-folded identity used for deduplication.
    pub fn identity(&self) -> InstanceKey {
        InstanceKey {
            product_directory: fold_case(&self.product_directory),
            root_suffix: fold_case(&self.root_suffix),
        }
    }

    /// Total order: version, product directory, root suffix.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| cmp_ignore_case(&self.product_directory, &other.product_directory))
            .then_with(|| cmp_ignore_case(&self.root_suffix, &other.root_suffix))
    }

    /// Like [`Instance::total_cmp`], with any instance greater than `None`.
    pub fn compare_to(&self, other: Option<&Self>) -> Ordering {
        match other {
            Some(other) => self.total_cmp(other),
            None => Ordering::Greater,
        }
    }
}

/// Identity equality: product directory and root suffix, ignoring case.
///
/// Versions are not compared, so `a == b` can hold while `a < b` under
/// [`PartialOrd`]. Use [`Instance::identity`] or [`Instance::total_cmp`]
/// explicitly when picking between same-identity instances with `max_by`,
/// `dedup_by` and the like.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_case(&self.product_directory, &other.product_directory)
            && eq_ignore_case(&self.root_suffix, &other.root_suffix)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Relational operators follow [`Instance::total_cmp`].
///
/// Two instances with the same identity but different versions are `==` yet
/// not order-equal. A discovery result never holds such a pair.
impl PartialOrd for Instance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_cmp(other))
    }
}

/// Case-folded (product directory, root suffix) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    product_directory: String,
    root_suffix: String,
}

fn with_trailing_separator(mut dir: String) -> String {
    if !dir.ends_with(['\\', '/']) {
        dir.push(PATH_SEPARATOR);
    }
    dir
}

/// Join an installation root and a relative path with exactly one separator.
pub fn join_path(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches(['\\', '/']);
    let relative = relative.trim_start_matches(['\\', '/']);
    if relative.is_empty() {
        return root.to_string();
    }
    format!("{root}{PATH_SEPARATOR}{relative}")
}

/// Everything before the final separator, or `""` if there is none.
pub fn parent_directory(path: &str) -> &str {
    path.rfind(['\\', '/']).map_or("", |idx| &path[..idx])
}

fn fold_case(s: &str) -> String {
    folded(s).collect()
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_uppercase)
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    folded(a).cmp(folded(b))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    folded(a).eq(folded(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn instance(version: Version, dir: &str, suffix: &str) -> Instance {
        Instance::new(
            version,
            Edition::Community,
            InstanceParts {
                display_name: "Visual Studio Community 2019".into(),
                product_directory: dir.into(),
                root_suffix: suffix.into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn product_directory_gets_trailing_separator() {
        let a = instance(Version::new(14, 0), r"C:\VS14", "");
        assert_eq!(a.product_directory(), r"C:\VS14\");

        let b = instance(Version::new(14, 0), r"C:\VS14\", "");
        assert_eq!(b.product_directory(), r"C:\VS14\");

        let c = instance(Version::new(14, 0), "/opt/vs/", "");
        assert_eq!(c.product_directory(), "/opt/vs/");
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let a = instance(Version::new(14, 0), r"C:\VS14", "");
        assert_eq!(a.nickname(), "");
        assert_eq!(a.id(), "");
        assert_eq!(a.root_suffix(), "");
        assert!(!a.is_prerelease());
    }

    #[test]
    fn equality_ignores_case_and_non_identity_fields() {
        let a = instance(Version::full(16, 0, 1, 0), r"C:\VS\Pro", "Exp");
        let b = instance(Version::full(16, 9, 9, 9), r"c:\vs\PRO\", "exp");
        let c = instance(Version::full(16, 0, 1, 0), r"C:\VS\Pro", "");
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(a, c);
    }

    #[test]
    fn equality_is_transitive() {
        let a = instance(Version::new(15, 0), r"C:\X", "");
        let b = instance(Version::new(15, 0), r"c:\x", "");
        let c = instance(Version::new(15, 0), r"C:\x\", "");
        assert!(a == b && b == c && a == c);
    }

    #[test]
    fn hash_agrees_with_equality() {
        let mut set = HashSet::new();
        set.insert(instance(Version::new(15, 0), r"C:\VS", ""));
        set.insert(instance(Version::new(16, 0), r"c:\vs\", ""));
        assert_eq!(set.len(), 1);
    }

    /// Equality and order disagree for the same install at two versions.
    #[test]
    fn same_identity_different_versions_are_equal_but_ordered() {
        let old = instance(Version::new(15, 0), r"C:\VS\Shared", "");
        let new = instance(Version::new(16, 0), r"c:\vs\shared\", "");
        assert!(old == new);
        assert!(old < new);
        assert_eq!(old.partial_cmp(&new), Some(Ordering::Less));
        assert_eq!(old.identity(), new.identity());
    }

    #[test]
    fn identity_key_is_case_folded() {
        let a = instance(Version::new(15, 0), r"C:\VS", "Exp");
        let b = instance(Version::new(15, 0), r"c:\vs", "EXP");
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn order_compares_version_first() {
        let old = instance(Version::full(15, 9, 0, 0), r"Z:\VS", "");
        let new = instance(Version::full(16, 0, 0, 0), r"A:\VS", "");
        assert_eq!(old.total_cmp(&new), Ordering::Less);
        assert!(old < new);
        assert!(new > old);
    }

    #[test]
    fn order_falls_back_to_directory_then_suffix() {
        let v = Version::full(16, 0, 0, 0);
        let a = instance(v, r"C:\A", "");
        let b = instance(v, r"c:\b", "");
        assert!(a < b);

        let plain = instance(v, r"C:\A", "");
        let exp = instance(v, r"C:\A", "Exp");
        assert!(plain < exp);
        assert!(plain <= exp);
        assert!(exp >= plain);
    }

    #[test]
    fn equal_identity_and_version_are_order_equal() {
        let v = Version::full(16, 0, 0, 0);
        let a = instance(v, r"C:\VS", "exp");
        let b = instance(v, r"c:\vs\", "EXP");
        assert_eq!(a.total_cmp(&b), Ordering::Equal);
        assert!(a <= b && a >= b);
        assert!(!(a < b) && !(a > b));
    }

    #[test]
    fn anything_is_greater_than_none() {
        let a = instance(Version::new(14, 0), r"C:\VS14", "");
        assert_eq!(a.compare_to(None), Ordering::Greater);
        assert_eq!(a.compare_to(Some(&a)), Ordering::Equal);
    }

    #[test]
    fn generation_predicates() {
        assert!(instance(Version::new(14, 0), r"C:\A", "").is_vs2015());
        assert!(instance(Version::full(15, 9, 0, 0), r"C:\A", "").is_vs2017());
        let vs2019 = instance(Version::full(16, 11, 0, 0), r"C:\A", "");
        assert!(vs2019.is_vs2019());
        assert!(!vs2019.is_vs2017());
        assert!(!vs2019.is_vs2015());
    }

    #[test]
    fn join_path_uses_single_separator() {
        assert_eq!(
            join_path(r"C:\VS\", r"Common7\IDE\devenv.exe"),
            r"C:\VS\Common7\IDE\devenv.exe"
        );
        assert_eq!(
            join_path(r"C:\VS", r"\Common7\IDE\devenv.exe"),
            r"C:\VS\Common7\IDE\devenv.exe"
        );
    }

    #[test]
    fn parent_directory_strips_file_name() {
        assert_eq!(
            parent_directory(r"C:\VS\Common7\IDE\devenv.exe"),
            r"C:\VS\Common7\IDE"
        );
        assert_eq!(parent_directory("devenv.exe"), "");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let a = instance(Version::full(16, 0, 1, 2), r"C:\VS", "");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["version"], "16.0.1.2");
        assert_eq!(json["edition"], "Community");
        assert_eq!(json["productDirectory"], r"C:\VS\");
        assert_eq!(json["isPrerelease"], false);
        assert_eq!(json["rootSuffix"], "");
    }
}
