//! Full-sweep reconciliation between the manifest and the remote release set.
//!
//! This is a pure set-difference pass, recomputed from scratch each run; the
//! only state that matters is "does this tag currently exist remotely", and
//! that is cheap to re-derive (bounded by release count, not asset count).

use indexmap::IndexMap;
use tracing::{info, warn};

use dbrel_domain::{
    classify, compose_tag, parse_tag, Manifest, ParsedTag, PlatformAsset, VersionRelease,
};

use crate::github::{ChecksumSource, RemoteRelease, CHECKSUMS_ASSET};

#[derive(Clone, Debug, Default)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub warnings: Vec<String>,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn merge(&mut self, other: ReconcileOutcome) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.warnings.extend(other.warnings);
    }

    pub(crate) fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Diff the manifest's tags against the remote set and apply removals, then
/// additions. Recoverable problems (bad tag, missing ledger, unverifiable
/// asset) narrow admission and become warnings; they never abort the sweep.
pub fn reconcile(
    manifest: &mut Manifest,
    remote: &IndexMap<String, RemoteRelease>,
    checksums: &dyn ChecksumSource,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    let local = manifest.tag_index();

    // An entry whose tag does not reconstruct from its own location is
    // unreconcilable; flag it rather than mis-filing anything against it.
    for (tag, (database, version)) in &local {
        if &compose_tag(database, version) != tag {
            outcome.warn(format!(
                "manifest entry {database}/{version} carries tag {tag}, \
                 which does not reconstruct from its location"
            ));
        }
    }

    // Removals before additions: a tag that vanished and reappeared within
    // one run is treated as added fresh, never as a stale update.
    for tag in local.keys() {
        if !remote.contains_key(tag) {
            manifest.remove_tag(tag);
            outcome.removed.push(tag.clone());
            info!(tag = %tag, "removed release no longer present upstream");
        }
    }

    for (tag, release) in remote {
        if local.contains_key(tag) {
            continue;
        }
        if let Some((database, entry)) = synthesize_release(release, checksums, &mut outcome) {
            manifest.upsert(&database, entry);
            outcome.added.push(tag.clone());
            info!(tag = %tag, "admitted new release");
        }
    }

    outcome
}

/// Derive a manifest location from the release's tag and synthesize its
/// entry. Only the sweep goes through here; the single-release path knows
/// its database and version up front and calls [`synthesize_entry`]
/// directly, so tag-grammar ambiguity never decides where a requested
/// release is filed.
pub(crate) fn synthesize_release(
    release: &RemoteRelease,
    checksums: &dyn ChecksumSource,
    outcome: &mut ReconcileOutcome,
) -> Option<(String, VersionRelease)> {
    let (database, version) = match parse_tag(&release.tag) {
        ParsedTag::Valid { database, version } => (database, version),
        ParsedTag::Unparseable { raw } => {
            outcome.warn(format!("skipping tag {raw}: no database/version split point"));
            return None;
        }
    };
    synthesize_entry(release, &version, checksums, outcome).map(|entry| (database, entry))
}

/// Build the manifest entry for one remote release under a caller-supplied
/// version, or `None` when nothing about it can be admitted. Every asset
/// that enters the result carries a digest looked up in the release's own
/// checksum ledger under the same filename; a release with zero verifiable
/// assets is not admitted at all.
pub(crate) fn synthesize_entry(
    release: &RemoteRelease,
    version: &str,
    checksums: &dyn ChecksumSource,
    outcome: &mut ReconcileOutcome,
) -> Option<VersionRelease> {
    let ledger = match checksums.checksums(&release.tag) {
        Ok(Some(ledger)) if !ledger.is_empty() => ledger,
        Ok(_) => {
            outcome.warn(format!(
                "skipping {}: missing or empty {CHECKSUMS_ASSET}",
                release.tag
            ));
            return None;
        }
        Err(err) => {
            outcome.warn(format!(
                "skipping {}: could not fetch {CHECKSUMS_ASSET}: {err:#}",
                release.tag
            ));
            return None;
        }
    };

    let mut platforms = IndexMap::new();
    for asset in &release.assets {
        if asset.name == CHECKSUMS_ASSET {
            continue;
        }
        let Some(platform) = classify(&asset.name) else {
            outcome.warn(format!(
                "{}: asset {} matches no platform; ignoring it",
                release.tag, asset.name
            ));
            continue;
        };
        let Some(digest) = ledger.digest(&asset.name) else {
            outcome.warn(format!(
                "{}: asset {} has no checksum entry; not admitting it",
                release.tag, asset.name
            ));
            continue;
        };
        platforms.insert(
            platform.as_str().to_string(),
            PlatformAsset {
                url: asset.browser_download_url.clone(),
                sha256: digest.to_string(),
                size: asset.size,
            },
        );
    }

    if platforms.is_empty() {
        outcome.warn(format!(
            "{}: no verifiable platform assets; release not admitted",
            release.tag
        ));
        return None;
    }

    Some(VersionRelease {
        version: version.to_string(),
        release_tag: release.tag.clone(),
        released_at: release.published_at.clone(),
        platforms,
    })
}
