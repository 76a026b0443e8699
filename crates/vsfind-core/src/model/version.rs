/// Four-component product version (`major.minor[.build[.revision]]`).
///
/// Build and revision are optional. An absent component sorts before any
/// present one, so `14.0` < `14.0.0` < `14.0.0.0` < `14.0.0.1`.
use crate::error::ParseVersionError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    // Field order drives the derived component-wise ordering.
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl Version {
    /// Version with only major and minor present.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Version with all four components present.
    pub const fn full(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// Parse a version that must have exactly `major.minor`.
    ///
    /// Returns `None` for anything else, including valid 3- and 4-part
    /// versions. Used to pick registry child keys such as `14.0`.
    pub fn parse_two_part(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        if minor.contains('.') {
            return None;
        }
        Some(Self::new(parse_component(major)?, parse_component(minor)?))
    }
}

/// Digits only: no sign, no whitespace, no empty component.
fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };

        let parts: Vec<&str> = s.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(err());
        }

        let mut components = [None; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = Some(parse_component(part).ok_or_else(err)?);
        }

        match components {
            [Some(major), Some(minor), build, revision] => Ok(Self {
                major,
                minor,
                build,
                revision,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_to_four_components() {
        assert_eq!("14.0".parse::<Version>().unwrap(), Version::new(14, 0));
        assert_eq!(
            "15.9.28307".parse::<Version>().unwrap(),
            Version {
                major: 15,
                minor: 9,
                build: Some(28307),
                revision: None,
            }
        );
        assert_eq!(
            "16.11.34031.81".parse::<Version>().unwrap(),
            Version::full(16, 11, 34031, 81)
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "15", "15.", ".1", "1.2.3.4.5", "15.x", "-1.0", " 15.0", "15..0"] {
            assert!(bad.parse::<Version>().is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn parse_error_carries_input() {
        let err = "abc".parse::<Version>().unwrap_err();
        assert_eq!(err.input, "abc");
    }

    #[test]
    fn two_part_parse_is_strict() {
        assert_eq!(Version::parse_two_part("14.0"), Some(Version::new(14, 0)));
        assert_eq!(Version::parse_two_part("8.0"), Some(Version::new(8, 0)));
        assert_eq!(Version::parse_two_part("14.0.0"), None);
        assert_eq!(Version::parse_two_part("14"), None);
        assert_eq!(Version::parse_two_part("VSTO"), None);
        assert_eq!(Version::parse_two_part("14.0_Config"), None);
    }

    #[test]
    fn ordering_is_component_wise() {
        let a: Version = "15.9.1.0".parse().unwrap();
        let b: Version = "15.10.0.0".parse().unwrap();
        let c: Version = "16.0.0.0".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn absent_components_sort_first() {
        let short = Version::new(14, 0);
        let long = Version::full(14, 0, 0, 0);
        assert!(short < long);
    }

    #[test]
    fn display_prints_present_components_only() {
        assert_eq!(Version::new(14, 0).to_string(), "14.0");
        assert_eq!(Version::full(17, 8, 34330, 188).to_string(), "17.8.34330.188");
    }
}
