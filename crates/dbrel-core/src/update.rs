//! Single-release update path, used by CI right after a release publishes.
//!
//! The triggering job only has certain knowledge about the release it just
//! created, so the caller always follows this with a full reconciliation
//! sweep to catch anything deleted in the interim.

use anyhow::{Context, Result};
use tracing::info;

use dbrel_domain::{compose_tag, Manifest};

use crate::github::GithubClient;
use crate::reconcile::{synthesize_entry, ReconcileOutcome};
use crate::UserError;

#[derive(Clone, Debug)]
pub struct ReleaseRequest {
    pub database: String,
    pub version: String,
    pub tag: String,
}

/// Fetch exactly one known release, verify its assets against its checksum
/// ledger, and upsert the result wholesale (replacing any prior entry for
/// that database/version).
///
/// The entry is filed under the request's own database/version; the tag is
/// never re-parsed on this path, so a database name the tag grammar would
/// split differently still lands where the caller said.
///
/// Unlike the sweep, an unverifiable requested release is an error: the
/// caller asked for this specific tag, so "nothing admitted" means the
/// release workflow produced a broken release.
pub fn apply_single_release(
    manifest: &mut Manifest,
    client: &GithubClient,
    request: &ReleaseRequest,
) -> Result<ReconcileOutcome> {
    let expected = compose_tag(&request.database, &request.version);
    if expected != request.tag {
        return Err(UserError::new(format!(
            "tag {} does not reconstruct from {}/{} (expected {expected}); refusing to file it",
            request.tag, request.database, request.version
        ))
        .into());
    }

    let release = client
        .fetch_release(&request.tag)
        .with_context(|| format!("failed to fetch release {}", request.tag))?;

    let mut outcome = ReconcileOutcome::default();
    let Some(entry) = synthesize_entry(&release, &request.version, client, &mut outcome) else {
        let mut message = format!(
            "release {} has no verifiable platform assets",
            request.tag
        );
        if !outcome.warnings.is_empty() {
            message.push_str(": ");
            message.push_str(&outcome.warnings.join("; "));
        }
        return Err(UserError::new(message).into());
    };

    let replacing = manifest.tag_index().contains_key(&request.tag);
    manifest.upsert(&request.database, entry);
    if replacing {
        info!(tag = %request.tag, "replaced existing manifest entry");
    } else {
        outcome.added.push(request.tag.clone());
        info!(tag = %request.tag, "recorded new release");
    }

    Ok(outcome)
}
