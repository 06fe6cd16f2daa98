//! Per-release checksum ledger, parsed from a `checksums.txt` asset.

use indexmap::IndexMap;

/// Filename -> lowercase hex sha256 digest mapping for one release.
///
/// The manifest's `sha256` field is the only integrity guarantee a consumer
/// has before executing a downloaded binary, so an asset without a ledger
/// entry must never be admitted. An empty ledger means the whole release is
/// unverifiable and gets skipped by the addition path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecksumLedger {
    entries: IndexMap<String, String>,
}

impl ChecksumLedger {
    /// Parse a checksums body: one `<64-hex-sha256><space-or-tab run>
    /// <filename>` pair per line. Lines not matching that shape are ignored,
    /// not errors.
    pub fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();
        for line in text.lines() {
            let line = line.trim();
            let Some((digest, rest)) = line.split_at_checked(64) else {
                continue;
            };
            if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                continue;
            }
            if !rest.starts_with([' ', '\t']) {
                continue;
            }
            // sha256sum prefixes binary-mode filenames with `*`.
            let filename = rest.trim_start().trim_start_matches('*');
            if filename.is_empty() {
                continue;
            }
            entries.insert(filename.to_string(), digest.to_ascii_lowercase());
        }
        Self { entries }
    }

    pub fn digest(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
