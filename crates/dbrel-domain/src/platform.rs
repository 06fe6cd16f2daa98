//! Asset-filename platform classification.

use std::fmt;

/// The fixed set of platforms release archives are built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    DarwinX64,
    DarwinArm64,
    Win32X64,
}

impl Platform {
    /// Classification order. The identifiers are pairwise substring-disjoint
    /// (see `identifiers_are_substring_disjoint`), so first match is only
    /// match; re-verify that property before growing this set.
    pub const ALL: [Self; 5] = [
        Self::LinuxX64,
        Self::LinuxArm64,
        Self::DarwinX64,
        Self::DarwinArm64,
        Self::Win32X64,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::Win32X64 => "win32-x64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an asset filename to a platform by substring containment.
///
/// Filenames matching no platform (the checksums file, vendor-added extras)
/// classify to `None` and are ignored by admission.
pub fn classify(filename: &str) -> Option<Platform> {
    Platform::ALL
        .into_iter()
        .find(|platform| filename.contains(platform.as_str()))
}
