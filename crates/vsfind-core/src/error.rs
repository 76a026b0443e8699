/// Error types for instance discovery.
///
/// Failures fall into two groups. [`SourceError`] covers anything that goes
/// wrong while talking to the registry or the setup-query service; the
/// scanners absorb these and degrade to fewer results. The remaining
/// [`DiscoveryError`] variants describe data that is present but wrong, and
/// are reported to the caller instead of producing a mislabelled instance.
use thiserror::Error;

/// A version string that is not 2 to 4 dot-separated unsigned integers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string {input:?}")]
pub struct ParseVersionError {
    /// The text that failed to parse.
    pub input: String,
}

/// Failure while reading from one of the two discovery mechanisms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The setup-query service class is not registered on this machine,
    /// which means no setup-query based product generation is installed.
    #[error("setup configuration service is not registered")]
    NotRegistered,

    /// A registry call returned a Win32 error code.
    #[error("registry {operation} failed with code {code}")]
    Registry { operation: String, code: u32 },

    /// A COM call returned a failing HRESULT.
    #[error("COM {operation} failed with HRESULT {code:#010x}")]
    Com { operation: String, code: u32 },

    /// Any other host-level failure.
    #[error("discovery source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// `true` for the "not registered" condition that signals an expected,
    /// empty result rather than a malfunction.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered)
    }
}

/// Errors produced while building [`crate::model::Instance`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// An installation reported a malformed version string.
    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),

    /// The product identifier ends in an edition name this crate does not know.
    #[error("unrecognized edition in product id {product_id:?}")]
    UnknownEdition { product_id: String },

    /// Communication with a discovery mechanism failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl DiscoveryError {
    /// `true` when the error is a data problem that must reach the caller,
    /// as opposed to a source failure the scanners degrade around.
    pub fn is_hard_failure(&self) -> bool {
        !matches!(self, Self::Source(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_are_soft() {
        let err = DiscoveryError::from(SourceError::NotRegistered);
        assert!(!err.is_hard_failure());

        let err = DiscoveryError::from(SourceError::Com {
            operation: "EnumInstances".into(),
            code: 0x8000_4005,
        });
        assert!(!err.is_hard_failure());
    }

    #[test]
    fn data_errors_are_hard() {
        let err = DiscoveryError::from(ParseVersionError {
            input: "15.x".into(),
        });
        assert!(err.is_hard_failure());

        let err = DiscoveryError::UnknownEdition {
            product_id: "Microsoft.VisualStudio.Product.Ultimate".into(),
        };
        assert!(err.is_hard_failure());
    }

    #[test]
    fn com_error_formats_hresult_as_hex() {
        let err = SourceError::Com {
            operation: "Next".into(),
            code: 0x8000_4005,
        };
        assert_eq!(err.to_string(), "COM Next failed with HRESULT 0x80004005");
    }

    #[test]
    fn only_not_registered_is_flagged() {
        assert!(SourceError::NotRegistered.is_not_registered());
        assert!(!SourceError::Unavailable("x".into()).is_not_registered());
    }
}
