use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional file name for the published manifest.
pub const MANIFEST_FILE: &str = "releases.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest at {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The on-disk `releases.json` tree: database -> version -> platform asset.
///
/// Map key order is whatever order entries were inserted in; the canonical
/// presentation order is imposed by [`crate::canonical`] immediately before
/// serialization, never assumed here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub repository: String,
    pub last_updated: Option<String>,
    pub databases: IndexMap<String, VersionTable>,
}

pub type VersionTable = IndexMap<String, VersionRelease>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRelease {
    pub version: String,
    pub release_tag: String,
    pub released_at: Option<String>,
    pub platforms: IndexMap<String, PlatformAsset>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAsset {
    pub url: String,
    pub sha256: String,
    pub size: u64,
}

impl Manifest {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            last_updated: None,
            databases: IndexMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ManifestError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Every release tag currently recorded, mapped to its manifest location.
    pub fn tag_index(&self) -> IndexMap<String, (String, String)> {
        let mut index = IndexMap::new();
        for (database, versions) in &self.databases {
            for (version, release) in versions {
                index.insert(
                    release.release_tag.clone(),
                    (database.clone(), version.clone()),
                );
            }
        }
        index
    }

    /// Insert or wholesale-replace the entry for `{database, version}`.
    pub fn upsert(&mut self, database: &str, release: VersionRelease) {
        self.databases
            .entry(database.to_string())
            .or_default()
            .insert(release.version.clone(), release);
    }

    /// Remove the entry carrying `tag`; an emptied version table takes its
    /// database key with it. Returns false when no entry carries the tag.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some((database, version)) = self.tag_index().get(tag).cloned() else {
            return false;
        };
        if let Some(versions) = self.databases.get_mut(&database) {
            versions.shift_remove(&version);
            if versions.is_empty() {
                self.databases.shift_remove(&database);
            }
        }
        true
    }
}
