//! Release-tag codec.
//!
//! Tags look like `{database}-{version}`, but database names may themselves
//! contain hyphens (`percona-server-8.0.36`), so the split point is the first
//! hyphen immediately followed by a digit. That heuristic holds for every
//! database currently cataloged; a name with a digit-prefixed segment before
//! its version would misparse, which is why callers get an explicit
//! [`ParsedTag::Unparseable`] instead of a guess.

/// Outcome of parsing a release tag.
///
/// Downstream logic must handle `Unparseable` explicitly; a foreign tag in
/// the same repository (created by an unrelated process) must narrow to a
/// warning, never abort a whole reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedTag {
    Valid { database: String, version: String },
    Unparseable { raw: String },
}

impl ParsedTag {
    pub fn valid(&self) -> Option<(&str, &str)> {
        match self {
            Self::Valid { database, version } => Some((database, version)),
            Self::Unparseable { .. } => None,
        }
    }
}

/// Split `tag` at the first hyphen that is immediately followed by a digit.
pub fn parse_tag(tag: &str) -> ParsedTag {
    let bytes = tag.as_bytes();
    for (idx, pair) in bytes.windows(2).enumerate() {
        if pair[0] == b'-' && pair[1].is_ascii_digit() && idx > 0 {
            return ParsedTag::Valid {
                database: tag[..idx].to_string(),
                version: tag[idx + 1..].to_string(),
            };
        }
    }
    ParsedTag::Unparseable {
        raw: tag.to_string(),
    }
}

/// Pure inverse of [`parse_tag`], for the known-input single-release path.
pub fn compose_tag(database: &str, version: &str) -> String {
    format!("{database}-{version}")
}
