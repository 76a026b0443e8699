/// Registry scanner for the one-instance-per-version product generations.
///
/// Layout read (machine scope, 32-bit registry view):
///
/// ```text
/// SOFTWARE\Microsoft\VisualStudio\
///   14.0\
///     Setup\VS\
///       ProductDir            = C:\Program Files (x86)\Microsoft Visual Studio 14.0\
///       EnvironmentDirectory  = ...\Common7\IDE\
///       EnvironmentPath       = ...\Common7\IDE\devenv.exe
///       Community\            (present on Community installs)
///       Pro\                  (present on Professional installs)
/// ```
///
/// Child keys that are not a two-part version, and versions without a
/// `Setup\VS` key, belong to unrelated products and are skipped with a
/// debug log.
use crate::error::SourceError;
use crate::model::edition::{legacy_display_name, legacy_edition, year_label};
use crate::model::{Instance, InstanceParts, Version};
use crate::source::{ConfigKey, ConfigStore};
use tracing::{debug, warn};

/// Root key holding one child per registered product version.
pub const LEGACY_ROOT: &str = r"SOFTWARE\Microsoft\VisualStudio";
/// Setup key beneath each version key.
pub const SETUP_SUBKEY: &str = r"Setup\VS";

const PRODUCT_DIR_VALUE: &str = "ProductDir";
const ENVIRONMENT_DIRECTORY_VALUE: &str = "EnvironmentDirectory";
const ENVIRONMENT_PATH_VALUE: &str = "EnvironmentPath";

/// Scan the registry for legacy installations.
///
/// Registry failures are logged and yield whatever was collected so far;
/// this scanner never fails the overall discovery.
pub fn scan<S: ConfigStore>(store: &S) -> Vec<Instance> {
    let mut instances = Vec::new();
    if let Err(err) = scan_into(store, &mut instances) {
        warn!("Legacy registry scan aborted: {err}");
    }
    instances
}

fn scan_into<S: ConfigStore>(store: &S, out: &mut Vec<Instance>) -> Result<(), SourceError> {
    let Some(root) = store.open(LEGACY_ROOT)? else {
        debug!("Registry key {LEGACY_ROOT} not present");
        return Ok(());
    };

    for name in root.subkey_names()? {
        let Some(version) = Version::parse_two_part(&name) else {
            debug!("Skipping registry key {name}: not a version");
            continue;
        };

        match read_candidate(&root, &name, version) {
            Ok(Some(instance)) => {
                debug!(
                    "Found {} at {}",
                    instance.display_name(),
                    instance.product_directory()
                );
                out.push(instance);
            }
            Ok(None) => debug!("Skipping registry version {name}: no complete setup key"),
            Err(err) => warn!("Skipping registry version {name}: {err}"),
        }
    }

    Ok(())
}

/// Build the instance for one version key, or `None` when it has no setup
/// key or lacks one of the required values.
fn read_candidate<K: ConfigKey>(
    root: &K,
    name: &str,
    version: Version,
) -> Result<Option<Instance>, SourceError> {
    let Some(setup) = root.open_subkey(&format!(r"{name}\{SETUP_SUBKEY}"))? else {
        return Ok(None);
    };

    let product_directory = setup.string_value(PRODUCT_DIR_VALUE)?;
    let environment_directory = setup.string_value(ENVIRONMENT_DIRECTORY_VALUE)?;
    let environment_path = setup.string_value(ENVIRONMENT_PATH_VALUE)?;
    let (Some(product_directory), Some(environment_directory), Some(environment_path)) =
        (product_directory, environment_directory, environment_path)
    else {
        warn!("Registry version {name} has a setup key with missing values");
        return Ok(None);
    };

    let edition = legacy_edition(|marker| setup.has_subkey(marker))?;
    let display_name = legacy_display_name(edition, year_label(version.major));

    Ok(Some(Instance::new(
        version,
        edition,
        InstanceParts {
            display_name,
            product_directory,
            environment_directory,
            environment_path,
            ..InstanceParts::default()
        },
    )))
}
