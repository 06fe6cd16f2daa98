//! Blocking client for the remote release source.
//!
//! Listing failures are fatal for the whole run: a missing page would
//! masquerade as "these releases were deleted" and trigger bogus removals.

use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use dbrel_domain::ChecksumLedger;

use crate::config::Config;

pub const USER_AGENT: &str = "dbrel";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Releases per list page; a page shorter than this is the completion
/// sentinel.
pub const PAGE_SIZE: usize = 100;
/// Conventional name of the text asset carrying per-file digests.
pub const CHECKSUMS_ASSET: &str = "checksums.txt";

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteRelease {
    #[serde(rename = "tag_name")]
    pub tag: String,
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

/// Seam for per-tag checksum lookups, so reconciliation is testable without
/// a network. `Ok(None)` means the release publishes no checksums file.
pub trait ChecksumSource {
    fn checksums(&self, tag: &str) -> Result<Option<ChecksumLedger>>;
}

pub struct GithubClient {
    http: reqwest::blocking::Client,
    repository: String,
    api_base: String,
    download_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(repository: &str, config: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            repository: repository.to_string(),
            api_base: config.api_base.clone(),
            download_base: config.download_base.clone(),
            token: config.token.clone(),
        })
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Page through every release, keyed by tag. Last write wins if the
    /// remote ever returns a duplicate tag (it must not).
    pub fn fetch_all_releases(&self) -> Result<IndexMap<String, RemoteRelease>> {
        let mut releases = IndexMap::new();
        let mut page = 1_usize;
        loop {
            let url = format!(
                "{}/repos/{}/releases?per_page={PAGE_SIZE}&page={page}",
                self.api_base, self.repository
            );
            let batch: Vec<RemoteRelease> = self
                .get(&url)
                .send()
                .with_context(|| format!("failed to fetch {url}"))?
                .error_for_status()
                .with_context(|| format!("unexpected response for {url}"))?
                .json()
                .with_context(|| format!("failed to decode release list page {page}"))?;
            let count = batch.len();
            debug!(page, count, "fetched release list page");
            for release in batch {
                releases.insert(release.tag.clone(), release);
            }
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(releases)
    }

    pub fn fetch_release(&self, tag: &str) -> Result<RemoteRelease> {
        let url = format!(
            "{}/repos/{}/releases/tags/{tag}",
            self.api_base, self.repository
        );
        self.get(&url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?
            .json()
            .with_context(|| format!("failed to decode release {tag}"))
    }

    /// Fetch the checksums body by its convention URL; 404 means the release
    /// has none.
    pub fn fetch_checksums_text(&self, tag: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/{}/releases/download/{tag}/{CHECKSUMS_ASSET}",
            self.download_base, self.repository
        );
        let response = self
            .get(&url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?
            .text()
            .with_context(|| format!("failed to read {CHECKSUMS_ASSET} for {tag}"))?;
        Ok(Some(body))
    }
}

impl ChecksumSource for GithubClient {
    fn checksums(&self, tag: &str) -> Result<Option<ChecksumLedger>> {
        Ok(self
            .fetch_checksums_text(tag)?
            .map(|text| ChecksumLedger::parse(&text)))
    }
}
