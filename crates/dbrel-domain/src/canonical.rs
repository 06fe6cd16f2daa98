//! Deterministic manifest ordering and serialization.
//!
//! Canonicalization is an explicit sort pass rebuilding every map immediately
//! before serialization, so repeated runs over identical logical content
//! produce byte-identical files. That byte-identity is what lets the
//! reconciler detect a no-op with a content comparison instead of a semantic
//! diff.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::manifest::Manifest;

/// Rebuild `manifest` with databases ascending, versions descending by
/// numeric-segment comparison, and platforms ascending.
pub fn canonicalize(manifest: &Manifest) -> Manifest {
    let mut databases: Vec<_> = manifest.databases.iter().collect();
    databases.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut out = IndexMap::new();
    for (database, versions) in databases {
        let mut ordered: Vec<_> = versions.iter().collect();
        ordered.sort_by(|(a, _), (b, _)| compare_versions(b, a).then_with(|| a.cmp(b)));

        let mut table = IndexMap::new();
        for (version, release) in ordered {
            let mut platforms: Vec<_> = release.platforms.iter().collect();
            platforms.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut entry = release.clone();
            entry.platforms = platforms
                .into_iter()
                .map(|(platform, asset)| (platform.clone(), asset.clone()))
                .collect();
            table.insert(version.clone(), entry);
        }
        out.insert(database.clone(), table);
    }

    Manifest {
        repository: manifest.repository.clone(),
        last_updated: manifest.last_updated.clone(),
        databases: out,
    }
}

/// Canonical serialized form: sorted maps, pretty JSON, trailing newline.
/// The newline is part of the canonical bytes and affects no-op detection.
pub fn render_manifest(manifest: &Manifest) -> Result<String, serde_json::Error> {
    let mut rendered = serde_json::to_string_pretty(&canonicalize(manifest))?;
    rendered.push('\n');
    Ok(rendered)
}

/// Numeric segments of a version string: split on `.`, parse each segment as
/// an integer, non-numeric or missing segments fall back to 0.
///
/// This is deliberately not semver: `1.2.0-rc1` ties with `1.2.0` and
/// pre-release suffixes sort arbitrarily among themselves.
pub fn version_segments(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|segment| segment.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two version strings ascending, segment by segment, treating
/// missing trailing segments as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = version_segments(a);
    let right = version_segments(b);
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}
