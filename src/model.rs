//! Shared value types: transfer candidates and the action decided for each.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// An item considered for transfer: a local file, a member or a USS entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Path relative to the walk root or listing base, `/`-separated.
    pub relative_path: String,
    /// Absolute local path (uploads) or remote reference (downloads).
    pub reference: String,
    pub size_bytes: Option<u64>,
    /// Octal permission bits such as `755`, or a symbolic `rwxr-xr-x` string.
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub is_directory: bool,
    /// Owning dataset for members and sequential datasets; `None` for USS and local files.
    pub dataset: Option<String>,
    /// Path at the destination when it differs from `relative_path`.
    pub target_path: Option<String>,
}

impl Candidate {
    /// A bare candidate with no metadata; mostly useful for listings and tests.
    pub fn new(relative_path: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            reference: reference.into(),
            size_bytes: None,
            permissions: None,
            owner: None,
            group: None,
            modified_at: None,
            is_directory: false,
            dataset: None,
            target_path: None,
        }
    }

    /// Relative path written at the destination.
    pub fn target(&self) -> &str {
        self.target_path.as_deref().unwrap_or(&self.relative_path)
    }

    /// Final segment of the relative path.
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Number of segments in the relative path (`a.txt` is depth 1).
    pub fn depth(&self) -> usize {
        self.relative_path
            .split('/')
            .filter(|s| !s.is_empty())
            .count()
    }
}

/// Why an item was deliberately not transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    AttributeExcluded,
    AlreadyExists,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::AttributeExcluded => "attribute-excluded",
            SkipReason::AlreadyExists => "already exists",
            SkipReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// What to do with one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Skip {
        reason: SkipReason,
    },
    TransferText {
        local_encoding: String,
        remote_encoding: String,
    },
    TransferBinary,
}

impl Action {
    pub fn skip(reason: SkipReason) -> Self {
        Action::Skip { reason }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Action::Skip { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Skip { reason } => write!(f, "skip ({reason})"),
            Action::TransferText {
                local_encoding,
                remote_encoding,
            } => write!(f, "text {local_encoding} -> {remote_encoding}"),
            Action::TransferBinary => f.write_str("binary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_depth_follow_segments() {
        let c = Candidate::new("a/b/c.txt", "/x/a/b/c.txt");
        assert_eq!(c.name(), "c.txt");
        assert_eq!(c.depth(), 3);
        let top = Candidate::new("M1", "HLQ.PDS/M1");
        assert_eq!(top.name(), "M1");
        assert_eq!(top.depth(), 1);
        assert_eq!(top.target(), "M1");
    }

    #[test]
    fn skip_reasons_render_like_reports() {
        assert_eq!(SkipReason::AttributeExcluded.to_string(), "attribute-excluded");
        assert_eq!(SkipReason::AlreadyExists.to_string(), "already exists");
        assert_eq!(Action::skip(SkipReason::Cancelled).to_string(), "skip (cancelled)");
    }
}
