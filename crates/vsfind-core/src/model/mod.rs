/// Data model for discovered installations.
///
/// Re-exports the instance entity and its supporting value types.
pub mod edition;
pub mod instance;
pub mod version;

pub use edition::Edition;
pub use instance::{Instance, InstanceKey, InstanceParts};
pub use version::Version;
