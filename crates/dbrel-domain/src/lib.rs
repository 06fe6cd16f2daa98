#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod canonical;
pub mod checksums;
pub mod manifest;
pub mod platform;
pub mod tag;

pub use canonical::{canonicalize, compare_versions, render_manifest, version_segments};
pub use checksums::ChecksumLedger;
pub use manifest::{Manifest, ManifestError, PlatformAsset, VersionRelease, VersionTable};
pub use platform::{classify, Platform};
pub use tag::{compose_tag, parse_tag, ParsedTag};
