#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

use thiserror::Error;

pub mod config;
pub mod github;
pub mod publish;
pub mod reconcile;
pub mod sync;
pub mod update;

pub use config::Config;
pub use dbrel_domain::manifest::MANIFEST_FILE;
pub use github::{ChecksumSource, GithubClient, RemoteAsset, RemoteRelease};
pub use publish::{commit_and_push, write_if_changed, PublishResult};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use sync::{run_sync, SyncRequest, SyncSummary};
pub use update::{apply_single_release, ReleaseRequest};

/// A failure the operator can correct (bad arguments, unknown release,
/// mismatched identifiers). The CLI maps this to exit code 1; everything
/// else exits 2.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UserError {
    message: String,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
