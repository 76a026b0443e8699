/// Product edition and generation classification.
///
/// Small lookup tables that turn raw registry and setup-query strings into
/// an [`Edition`] and a generation year label. All functions are pure.
use crate::error::DiscoveryError;
use serde::Serialize;

/// Product tier of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Edition {
    None,
    Community,
    Professional,
    Enterprise,
    BuildTools,
    TeamExplorer,
    TestAgent,
    TestController,
    TestProfessional,
    Express,
}

impl Edition {
    /// Every edition, in declaration order.
    pub const ALL: [Edition; 10] = [
        Self::None,
        Self::Community,
        Self::Professional,
        Self::Enterprise,
        Self::BuildTools,
        Self::TeamExplorer,
        Self::TestAgent,
        Self::TestController,
        Self::TestProfessional,
        Self::Express,
    ];

    /// Canonical name, identical to the suffix used in setup product ids.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Community => "Community",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
            Self::BuildTools => "BuildTools",
            Self::TeamExplorer => "TeamExplorer",
            Self::TestAgent => "TestAgent",
            Self::TestController => "TestController",
            Self::TestProfessional => "TestProfessional",
            Self::Express => "Express",
        }
    }

    /// Human-readable label for display names.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::BuildTools => "Build Tools",
            Self::TeamExplorer => "Team Explorer",
            Self::TestAgent => "Test Agent",
            Self::TestController => "Test Controller",
            Self::TestProfessional => "Test Professional",
            other => other.name(),
        }
    }

    /// Case-insensitive lookup by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|edition| edition.name().eq_ignore_ascii_case(name))
    }
}

/// Registry sub-key marking a Community installation.
pub const COMMUNITY_MARKER: &str = "Community";
/// Registry sub-key marking a Professional installation.
pub const PROFESSIONAL_MARKER: &str = "Pro";

/// Generation year for a registry-era major version, or `""` if unknown.
pub fn year_label(major: u32) -> &'static str {
    match major {
        10 => "2010",
        11 => "2012",
        12 => "2013",
        14 => "2015",
        _ => "",
    }
}

/// Edition of a registry-era installation from its marker sub-keys.
///
/// `has_subkey` is asked about the Community marker first and only asked
/// about the Professional marker if the first is absent. A failing probe
/// stops classification.
pub fn legacy_edition<E>(
    mut has_subkey: impl FnMut(&str) -> Result<bool, E>,
) -> Result<Edition, E> {
    if has_subkey(COMMUNITY_MARKER)? {
        Ok(Edition::Community)
    } else if has_subkey(PROFESSIONAL_MARKER)? {
        Ok(Edition::Professional)
    } else {
        Ok(Edition::None)
    }
}

/// Edition from a dotted setup product id such as
/// `Microsoft.VisualStudio.Product.Enterprise`.
///
/// Fails on an unknown suffix; a guessed edition would be wrong silently.
pub fn modern_edition_from_product_id(product_id: &str) -> Result<Edition, DiscoveryError> {
    let suffix = product_id.rsplit('.').next().unwrap_or(product_id);
    Edition::from_name(suffix).ok_or_else(|| DiscoveryError::UnknownEdition {
        product_id: product_id.to_string(),
    })
}

/// `"Visual Studio [<edition> ]<year>"`, skipping empty parts.
pub fn legacy_display_name(edition: Edition, year: &str) -> String {
    ["Visual Studio", edition.label(), year]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
