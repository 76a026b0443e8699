/// vsfind Core — Visual Studio instance discovery.
///
/// This crate contains all discovery logic with no output formatting.
/// It is designed to be reusable by any frontend (CLI, build scripts, IDE
/// tooling).
///
/// # Modules
///
/// - [`model`] — The immutable `Instance` entity, versions and editions.
/// - [`scanner`] — Registry and setup-query scanners plus the orchestrator.
/// - [`source`] — Traits over the two discovery mechanisms, with in-memory
///   implementations.
/// - [`platform`] — Windows registry and setup configuration COM backends.
/// - [`error`] — Typed errors.
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod source;

pub use error::{DiscoveryError, ParseVersionError, SourceError};
pub use model::{Edition, Instance, Version};
pub use scanner::{
    discover, discover_with, DiscoveryOptions, InstanceList, DEFAULT_MINIMUM_MAJOR_VERSION,
};
