//! Run orchestration: load -> (optional single-release upsert) -> sweep ->
//! canonicalize -> write/publish.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use dbrel_domain::{render_manifest, Manifest};

use crate::config::Config;
use crate::github::GithubClient;
use crate::publish::{self, PublishResult};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::update::{apply_single_release, ReleaseRequest};
use crate::UserError;

#[derive(Clone, Debug)]
pub struct SyncRequest {
    pub manifest_path: PathBuf,
    /// Initializes a missing manifest; must match an existing manifest's
    /// `repository` field when both are present.
    pub repository: Option<String>,
    /// Known-input single-release upsert to apply before the sweep.
    pub release: Option<ReleaseRequest>,
    pub dry_run: bool,
    pub push: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub warnings: Vec<String>,
    pub changed: bool,
    pub wrote: bool,
    pub pushed: bool,
    pub dry_run: bool,
}

impl SyncSummary {
    fn from_outcome(outcome: &ReconcileOutcome, dry_run: bool) -> Self {
        Self {
            added: outcome.added.clone(),
            removed: outcome.removed.clone(),
            warnings: outcome.warnings.clone(),
            changed: outcome.changed(),
            wrote: false,
            pushed: false,
            dry_run,
        }
    }
}

/// Execute one full run. The sweep always happens; a `release` request only
/// front-loads the known upsert (its tag is then already present when the
/// sweep diffs, so nothing is double-counted).
pub fn run_sync(config: &Config, request: &SyncRequest) -> Result<SyncSummary> {
    let mut manifest = load_or_init(&request.manifest_path, request.repository.as_deref())?;
    let client = GithubClient::new(&manifest.repository, config)?;

    let mut outcome = ReconcileOutcome::default();
    if let Some(release) = &request.release {
        outcome.merge(apply_single_release(&mut manifest, &client, release)?);
    }
    let remote = client
        .fetch_all_releases()
        .context("failed to list remote releases")?;
    outcome.merge(reconcile(&mut manifest, &remote, &client));

    let mut summary = SyncSummary::from_outcome(&outcome, request.dry_run);
    if request.dry_run {
        info!(
            added = summary.added.len(),
            removed = summary.removed.len(),
            "dry run; not writing"
        );
        return Ok(summary);
    }

    if request.push {
        let message = commit_message(&summary);
        let repo_root = request
            .manifest_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        // First attempt reuses the state computed above; retries rebuild
        // from the freshly reset on-disk manifest.
        let mut prepared = Some(manifest);
        let mut refresh = || -> Result<bool> {
            let mut manifest = match prepared.take() {
                Some(manifest) => manifest,
                None => {
                    let mut manifest =
                        load_or_init(&request.manifest_path, request.repository.as_deref())?;
                    if let Some(release) = &request.release {
                        apply_single_release(&mut manifest, &client, release)?;
                    }
                    let remote = client
                        .fetch_all_releases()
                        .context("failed to list remote releases")?;
                    reconcile(&mut manifest, &remote, &client);
                    manifest
                }
            };
            write_updated(&request.manifest_path, &mut manifest)
        };

        let result = publish::commit_and_push(
            &repo_root,
            &request.manifest_path,
            &message,
            config.push_attempts,
            &mut refresh,
        )?;
        summary.wrote = result != PublishResult::Unchanged;
        summary.pushed = result == PublishResult::Pushed;
    } else {
        summary.wrote = write_updated(&request.manifest_path, &mut manifest)?;
    }

    Ok(summary)
}

fn commit_message(summary: &SyncSummary) -> String {
    format!(
        "chore: update releases.json (+{} -{})",
        summary.added.len(),
        summary.removed.len()
    )
}

fn load_or_init(path: &Path, repository: Option<&str>) -> Result<Manifest> {
    if path.exists() {
        let manifest = Manifest::load(path)?;
        if let Some(repository) = repository {
            if repository != manifest.repository {
                return Err(UserError::new(format!(
                    "manifest at {} tracks {}, not {repository}",
                    path.display(),
                    manifest.repository
                ))
                .into());
            }
        }
        Ok(manifest)
    } else if let Some(repository) = repository {
        info!(repository, "initializing new manifest");
        Ok(Manifest::new(repository))
    } else {
        Err(UserError::new(format!(
            "{} does not exist; pass --repo to initialize it",
            path.display()
        ))
        .into())
    }
}

/// Canonicalize and write the manifest, stamping `lastUpdated` only when the
/// serialized bytes actually differ from what is on disk. A logically
/// unchanged world therefore stays byte-identical run over run.
fn write_updated(path: &Path, manifest: &mut Manifest) -> Result<bool> {
    let rendered = render_manifest(manifest).context("failed to serialize manifest")?;
    if fs::read_to_string(path).ok().as_deref() == Some(rendered.as_str()) {
        return Ok(false);
    }
    manifest.last_updated = Some(
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format timestamp")?,
    );
    let rendered = render_manifest(manifest).context("failed to serialize manifest")?;
    publish::write_if_changed(path, &rendered)
}
