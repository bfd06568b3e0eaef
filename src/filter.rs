//! Candidate filtering for the download path.
//!
//! The remote listing supplies raw candidates; these predicates narrow them.
//! All predicates are optional and AND-combined; an empty set matches
//! everything. A candidate lacking the attribute a predicate inspects (no size,
//! no timestamp, no group, ...) fails that predicate.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::errors::TransferEngineError;
use crate::matcher;
use crate::model::Candidate;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Byte-size predicate: `+N` at least, `-N` at most, bare `N` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFilter {
    AtLeast(u64),
    AtMost(u64),
    Exactly(u64),
}

impl SizeFilter {
    pub fn accepts(&self, size: u64) -> bool {
        match *self {
            SizeFilter::AtLeast(n) => size >= n,
            SizeFilter::AtMost(n) => size <= n,
            SizeFilter::Exactly(n) => size == n,
        }
    }
}

impl FromStr for SizeFilter {
    type Err = TransferEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransferEngineError::InvalidFilter {
            name: "size",
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        let (ctor, body): (fn(u64) -> SizeFilter, &str) = match trimmed.as_bytes().first() {
            Some(b'+') => (SizeFilter::AtLeast, &trimmed[1..]),
            Some(b'-') => (SizeFilter::AtMost, &trimmed[1..]),
            Some(_) => (SizeFilter::Exactly, trimmed),
            None => return Err(invalid("empty value")),
        };
        let split = body
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(body.len());
        let (digits, unit) = body.split_at(split);
        let n: u64 = digits.parse().map_err(|_| invalid("expected a number"))?;
        let multiplier: u64 = match unit.to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" => 1 << 10,
            "M" => 1 << 20,
            "G" => 1 << 30,
            "T" => 1 << 40,
            _ => return Err(invalid("unit must be one of B, K, M, G, T")),
        };
        let bytes = n
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value overflows"))?;
        Ok(ctor(bytes))
    }
}

/// Age predicate in whole days (`floor(age / 24h)`).
///
/// - `0`      modified within the last 24 hours
/// - `N`, `+N` modified at least N days ago
/// - `-N`     modified less than N days ago
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtimeFilter {
    WithinDays(u32),
    AtLeastDays(u32),
}

impl MtimeFilter {
    pub fn accepts(&self, modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age_days = (now - modified).num_seconds().max(0) / SECONDS_PER_DAY;
        match *self {
            MtimeFilter::WithinDays(n) => age_days < i64::from(n),
            MtimeFilter::AtLeastDays(n) => age_days >= i64::from(n),
        }
    }
}

impl FromStr for MtimeFilter {
    type Err = TransferEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransferEngineError::InvalidFilter {
            name: "mtime",
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        let (sign, digits) = match trimmed.as_bytes().first() {
            Some(b'+') | Some(b'-') => (Some(trimmed.as_bytes()[0]), &trimmed[1..]),
            Some(_) => (None, trimmed),
            None => return Err(invalid("empty value")),
        };
        let n: u32 = digits
            .parse()
            .map_err(|_| invalid("expected a whole number of days"))?;
        Ok(match (sign, n) {
            (Some(b'-'), 0) => return Err(invalid("'-0' matches nothing")),
            (Some(b'-'), n) => MtimeFilter::WithinDays(n),
            (None, 0) => MtimeFilter::WithinDays(1),
            (_, n) => MtimeFilter::AtLeastDays(n),
        })
    }
}

/// Entry type predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

impl FromStr for EntryType {
    type Err = TransferEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "f" => Ok(EntryType::File),
            "d" => Ok(EntryType::Directory),
            other => Err(TransferEngineError::InvalidFilter {
                name: "type",
                value: other.to_string(),
                reason: "expected 'f' or 'd'".into(),
            }),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryType::File => "f",
            EntryType::Directory => "d",
        })
    }
}

/// Optional, AND-combined predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicates {
    /// Wildcard on the relative path.
    pub pattern: Option<String>,
    pub size: Option<SizeFilter>,
    /// Octal permission bits such as `755`.
    pub permission: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Exact or wildcard match on the final path segment.
    pub name: Option<String>,
    pub mtime: Option<MtimeFilter>,
    pub entry_type: Option<EntryType>,
    /// Maximum number of path segments.
    pub depth: Option<usize>,
}

impl FilterPredicates {
    pub fn is_empty(&self) -> bool {
        *self == FilterPredicates::default()
    }

    /// Evaluate every predicate against `candidate`, with `now` as the age reference.
    pub fn accepts(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
        if let Some(pattern) = &self.pattern
            && !matcher::matches(pattern, &candidate.relative_path)
        {
            return false;
        }
        if let Some(name) = &self.name
            && !matcher::matches_name(name, candidate.name())
        {
            return false;
        }
        if let Some(kind) = self.entry_type {
            let wanted_dir = kind == EntryType::Directory;
            if candidate.is_directory != wanted_dir {
                return false;
            }
        }
        if let Some(max) = self.depth
            && candidate.depth() > max
        {
            return false;
        }
        if let Some(size) = &self.size
            && !candidate.size_bytes.is_some_and(|s| size.accepts(s))
        {
            return false;
        }
        if let Some(wanted) = &self.permission {
            let Some(wanted) = normalize_permission(wanted) else {
                return false;
            };
            if candidate
                .permissions
                .as_deref()
                .and_then(normalize_permission)
                != Some(wanted)
            {
                return false;
            }
        }
        if let Some(owner) = &self.owner
            && candidate.owner.as_deref() != Some(owner.as_str())
        {
            return false;
        }
        if let Some(group) = &self.group
            && candidate.group.as_deref() != Some(group.as_str())
        {
            return false;
        }
        if let Some(mtime) = &self.mtime
            && !candidate
                .modified_at
                .is_some_and(|m| mtime.accepts(m, now))
        {
            return false;
        }
        true
    }
}

/// Lazily keep the candidates accepted by `predicates`.
pub fn filter<'a, I>(
    candidates: I,
    predicates: &'a FilterPredicates,
    now: DateTime<Utc>,
) -> impl Iterator<Item = Candidate> + 'a
where
    I: IntoIterator<Item = Candidate>,
    I::IntoIter: 'a,
{
    candidates
        .into_iter()
        .filter(move |c| predicates.accepts(c, now))
}

/// Normalize `755`, `0755`, `rwxr-xr-x` or `-rwxr-xr-x` to the 9-bit mode.
pub fn normalize_permission(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return u32::from_str_radix(raw, 8).ok().map(|m| m & 0o777);
    }
    let chars: Vec<char> = raw.chars().collect();
    let symbolic = match chars.len() {
        10 => &chars[1..],
        9 => &chars[..],
        _ => return None,
    };
    let mut mode = 0u32;
    for (i, &ch) in symbolic.iter().enumerate() {
        let expected = ['r', 'w', 'x'][i % 3];
        mode <<= 1;
        if ch == expected {
            mode |= 1;
        } else if ch != '-' {
            return None;
        }
    }
    Some(mode)
}
