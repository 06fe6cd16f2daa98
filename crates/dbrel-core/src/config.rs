use std::collections::HashMap;
use std::env;

/// GitHub REST API root used when `DBREL_API_URL` is unset.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Release-asset download root used when `DBREL_DOWNLOAD_URL` is unset.
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com";

const DEFAULT_PUSH_ATTEMPTS: u32 = 3;
/// Upper bound on `DBREL_PUSH_ATTEMPTS`; the publisher's exponential backoff
/// assumes a small exponent.
const MAX_PUSH_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Process-level configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional API credential. Anonymous requests work but rate-limit fast
    /// during a full sweep's per-release checksum fetches.
    pub token: Option<String>,
    pub api_base: String,
    pub download_base: String,
    pub push_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let token = snapshot
            .var("DBREL_GITHUB_TOKEN")
            .or_else(|| snapshot.var("GITHUB_TOKEN"))
            .map(str::to_string);
        let api_base = snapshot
            .var("DBREL_API_URL")
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let download_base = snapshot
            .var("DBREL_DOWNLOAD_URL")
            .unwrap_or(DEFAULT_DOWNLOAD_BASE)
            .trim_end_matches('/')
            .to_string();
        let push_attempts = snapshot
            .var("DBREL_PUSH_ATTEMPTS")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PUSH_ATTEMPTS)
            .clamp(1, MAX_PUSH_ATTEMPTS);
        Self {
            token,
            api_base,
            download_base,
            push_attempts,
        }
    }
}
