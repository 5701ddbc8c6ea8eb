//! Dataset version tracking
//!
//! Remembers which dataset snapshot the served generation was built from,
//! so callers can skip a rebuild for a snapshot that is already live.

mod errors;
mod manifest;
mod tracker;

pub use errors::{VersionError, VersionResult};
pub use manifest::{VersionManifest, MANIFEST_FILE, MANIFEST_FORMAT_VERSION};
pub use tracker::VersionTracker;
