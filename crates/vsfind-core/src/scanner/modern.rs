/// Setup-query scanner for the multi-instance product generations.
///
/// Drains the setup configuration service one handle at a time. A service
/// that is not registered means those generations are not installed; any
/// other service failure is logged and ends the scan early. Neither aborts
/// discovery. Malformed versions and unknown editions do: a handle that
/// reports them is broken in a way the caller needs to see.
use crate::error::DiscoveryError;
use crate::model::edition::modern_edition_from_product_id;
use crate::model::instance::{join_path, parent_directory};
use crate::model::{Instance, InstanceParts, Version};
use crate::source::{InstanceEnumerator, PropertyStore, SetupInstance, SetupQuery};
use tracing::{debug, warn};

/// Locale used for display names (US English).
pub const LCID_EN_US: u32 = 1033;
/// Property-bag entry holding the install-time nickname.
pub const NICKNAME_PROPERTY: &str = "nickname";

/// Scan the setup-query service.
///
/// Instances read before a service failure are kept.
pub fn scan<Q: SetupQuery>(query: &Q) -> Result<Vec<Instance>, DiscoveryError> {
    let mut instances = Vec::new();
    match scan_into(query, &mut instances) {
        Ok(()) => {}
        Err(err) if err.is_hard_failure() => return Err(err),
        Err(DiscoveryError::Source(err)) if err.is_not_registered() => {
            debug!("Setup configuration service not registered; skipping setup-query scan");
        }
        Err(err) => warn!("Setup-query scan stopped early: {err}"),
    }
    Ok(instances)
}

fn scan_into<Q: SetupQuery>(query: &Q, out: &mut Vec<Instance>) -> Result<(), DiscoveryError> {
    let mut cursor = query.enum_instances()?;
    while let Some(handle) = cursor.next_instance()? {
        let instance = read_instance(&handle)?;
        debug!(
            "Found {} ({}) at {}",
            instance.display_name(),
            instance.version(),
            instance.product_directory()
        );
        out.push(instance);
    }
    Ok(())
}

/// Extract every field of one setup instance handle.
pub fn read_instance<I: SetupInstance>(handle: &I) -> Result<Instance, DiscoveryError> {
    let installation_path = handle.installation_path()?;
    let environment_path = join_path(&installation_path, &handle.product_path()?);
    let environment_directory = parent_directory(&environment_path).to_string();

    let version: Version = handle.installation_version()?.parse()?;
    let edition = modern_edition_from_product_id(&handle.product_id()?)?;

    Ok(Instance::new(
        version,
        edition,
        InstanceParts {
            display_name: handle.display_name(LCID_EN_US)?,
            product_directory: installation_path,
            environment_directory,
            environment_path,
            is_prerelease: handle.prerelease()?.unwrap_or(false),
            nickname: read_nickname(handle)?,
            id: handle.instance_id()?,
            root_suffix: String::new(),
        },
    ))
}

fn read_nickname<I: SetupInstance>(handle: &I) -> Result<String, DiscoveryError> {
    let Some(properties) = handle.properties()? else {
        return Ok(String::new());
    };
    if !properties.names()?.iter().any(|name| name == NICKNAME_PROPERTY) {
        return Ok(String::new());
    }
    Ok(properties.value(NICKNAME_PROPERTY)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::model::Edition;
    use crate::source::memory::{MemoryInstance, MemorySetupQuery};
    use std::collections::BTreeMap;

    fn vs2019(id: &str, product: &str) -> MemoryInstance {
        MemoryInstance {
            instance_id: id.into(),
            installation_path: format!(
                r"C:\Program Files (x86)\Microsoft Visual Studio\2019\{product}"
            ),
            product_path: r"Common7\IDE\devenv.exe".into(),
            installation_version: "16.11.34031.81".into(),
            product_id: format!("Microsoft.VisualStudio.Product.{product}"),
            display_name: format!("Visual Studio {product} 2019"),
            prerelease: Some(false),
            properties: Some(BTreeMap::new()),
            read_error: None,
        }
    }

    #[test]
    fn reads_every_field() {
        let mut data = vs2019("a1b2c3d4", "Professional");
        data.properties = Some(BTreeMap::from([(
            NICKNAME_PROPERTY.to_string(),
            "main".to_string(),
        )]));
        let found = scan(&MemorySetupQuery::new(vec![data])).unwrap();
        assert_eq!(found.len(), 1);

        let vs = &found[0];
        assert_eq!(vs.version(), Version::full(16, 11, 34031, 81));
        assert_eq!(vs.edition(), Edition::Professional);
        assert_eq!(vs.display_name(), "Visual Studio Professional 2019");
        assert_eq!(
            vs.product_directory(),
            r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Professional\"
        );
        assert_eq!(
            vs.environment_path(),
            r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Professional\Common7\IDE\devenv.exe"
        );
        assert_eq!(
            vs.environment_directory(),
            r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Professional\Common7\IDE"
        );
        assert_eq!(vs.nickname(), "main");
        assert_eq!(vs.id(), "a1b2c3d4");
        assert_eq!(vs.root_suffix(), "");
        assert!(!vs.is_prerelease());
    }

    #[test]
    fn missing_nickname_key_defaults_to_empty() {
        let mut data = vs2019("x", "Community");
        data.properties = Some(BTreeMap::from([("channelId".into(), "release".into())]));
        let found = scan(&MemorySetupQuery::new(vec![data])).unwrap();
        assert_eq!(found[0].nickname(), "");
    }

    #[test]
    fn missing_property_bag_defaults_to_empty() {
        let mut data = vs2019("x", "Community");
        data.properties = None;
        let found = scan(&MemorySetupQuery::new(vec![data])).unwrap();
        assert_eq!(found[0].nickname(), "");
    }

    #[test]
    fn prerelease_requires_catalog_capability() {
        let mut preview = vs2019("p", "Enterprise");
        preview.prerelease = Some(true);
        let mut no_catalog = vs2019("n", "Community");
        no_catalog.prerelease = None;

        let found = scan(&MemorySetupQuery::new(vec![preview, no_catalog])).unwrap();
        assert!(found[0].is_prerelease());
        assert!(!found[1].is_prerelease());
    }

    #[test]
    fn not_registered_yields_nothing() {
        let found = scan(&MemorySetupQuery::not_registered()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn service_failure_at_start_yields_nothing() {
        let query = MemorySetupQuery::failing(SourceError::Com {
            operation: "CoCreateInstance".into(),
            code: 0x8000_4005,
        });
        assert!(scan(&query).unwrap().is_empty());
    }

    #[test]
    fn service_failure_mid_scan_keeps_earlier_instances() {
        let query = MemorySetupQuery::new(vec![vs2019("a", "Community"), vs2019("b", "Enterprise")])
            .with_failure_after(
                1,
                SourceError::Com {
                    operation: "Next".into(),
                    code: 0x8001_0108,
                },
            );
        let found = scan(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "a");
    }

    #[test]
    fn handle_read_failure_is_soft() {
        let mut broken = vs2019("b", "Community");
        broken.read_error = Some(SourceError::Com {
            operation: "GetInstallationPath".into(),
            code: 0x8000_4005,
        });
        let query = MemorySetupQuery::new(vec![vs2019("a", "Community"), broken]);
        let found = scan(&query).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn malformed_version_is_a_hard_failure() {
        let mut data = vs2019("x", "Community");
        data.installation_version = "16.x".into();
        let err = scan(&MemorySetupQuery::new(vec![data])).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidVersion(_)));
    }

    #[test]
    fn unknown_edition_is_a_hard_failure() {
        let mut data = vs2019("x", "Community");
        data.product_id = "Microsoft.VisualStudio.Product.Ultimate".into();
        let err = scan(&MemorySetupQuery::new(vec![data])).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnknownEdition { .. }));
    }

    #[test]
    fn every_instance_handle_is_released() {
        let query =
            MemorySetupQuery::new(vec![vs2019("a", "Community"), vs2019("b", "Enterprise")]);
        scan(&query).unwrap();
        assert_eq!(query.open_handles(), 0);

        let mut bad = vs2019("c", "Community");
        bad.installation_version = "bad".into();
        let query = MemorySetupQuery::new(vec![bad]);
        assert!(scan(&query).is_err());
        assert_eq!(query.open_handles(), 0);
    }
}
