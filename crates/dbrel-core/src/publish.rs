//! Manifest publication: atomic file writes and the commit/push retry loop.
//!
//! Concurrency control is optimistic, via version control. Racing writers
//! may both read the same base manifest; one push gets rejected and goes
//! through the retry path, which drops the local commit, resets to the
//! freshly fetched remote tip, and re-runs reconciliation through the
//! caller's `refresh` closure. Replaying the stale diff onto new text could
//! drop another process's legitimately-added release.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

const REMOTE: &str = "origin";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
/// Backoff stops doubling here; `commit_and_push` takes the attempt bound
/// from callers, so the exponent must not be trusted to stay small.
const MAX_BACKOFF_EXPONENT: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishResult {
    /// The on-disk manifest already matched the recomputed state; nothing to
    /// commit. Another writer may have published the same state first.
    Unchanged,
    Pushed,
}

/// Write `contents` to `path` only when the bytes differ, via a temp file in
/// the same directory so readers never observe a partial manifest.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == contents {
            return Ok(false);
        }
    }
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage write for {}", path.display()))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Commit and push the manifest with a bounded retry on push rejection.
///
/// `refresh` must re-read the on-disk manifest, re-run reconciliation, write
/// the result, and report whether the file changed; it is invoked once per
/// attempt, so each retry rebuilds from the newly fetched base.
pub fn commit_and_push(
    repo_root: &Path,
    manifest_path: &Path,
    message: &str,
    max_attempts: u32,
    refresh: &mut dyn FnMut() -> Result<bool>,
) -> Result<PublishResult> {
    let path_arg = manifest_path.to_string_lossy().to_string();
    let attempts = max_attempts.max(1);

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = retry_delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
            thread::sleep(delay);
        }

        let changed = refresh()?;
        if !changed {
            return Ok(PublishResult::Unchanged);
        }

        git_ok(repo_root, &["add", &path_arg])?;
        git_ok(repo_root, &["commit", "-m", message])?;
        let branch = current_branch(repo_root)?;

        let push = git(repo_root, &["push", REMOTE, &branch])?;
        if push.status.success() {
            return Ok(PublishResult::Pushed);
        }
        let stderr = String::from_utf8_lossy(&push.stderr).trim().to_string();
        if attempt + 1 == attempts {
            bail!("push to {REMOTE}/{branch} rejected after {attempts} attempts: {stderr}");
        }
        warn!(attempt = attempt + 1, "push rejected: {stderr}; rebuilding from remote tip");

        git_ok(repo_root, &["fetch", REMOTE])?;
        git_ok(repo_root, &["reset", "--hard", &format!("{REMOTE}/{branch}")])?;
    }

    bail!("push retry loop exhausted without an outcome")
}

/// Exponential backoff before retry `attempt` (1-based), capped so the shift
/// cannot overflow no matter how large the configured attempt bound is.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2_u32.saturating_pow((attempt - 1).min(MAX_BACKOFF_EXPONENT))
}

pub fn current_branch(repo_root: &Path) -> Result<String> {
    let output = git(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if !output.status.success() {
        bail!(
            "failed to determine current branch: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn git(repo_root: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))
}

fn git_ok(repo_root: &Path, args: &[&str]) -> Result<()> {
    let output = git(repo_root, args)?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
