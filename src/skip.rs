//! Existing-artifact policy.
//!
//! Downloads skip items whose destination already exists unless overwrite is
//! requested. Uploads never skip silently: an existing remote artifact without
//! `replace` is a conflict, reported as a failure. Identity is existence of the
//! same relative path under the destination root, for members and sequential
//! items alike.

use std::path::{Component, Path, PathBuf};

use crate::errors::TransferError;
use crate::model::SkipReason;

/// Answers whether an artifact already exists at the destination.
pub trait DestinationProbe: Sync {
    fn exists(&self, relative_path: &str) -> bool;

    /// Human-readable location of `relative_path`, used in conflict messages.
    fn describe(&self, relative_path: &str) -> String {
        relative_path.to_string()
    }
}

/// Probe over a local destination directory (download path).
#[derive(Debug, Clone)]
pub struct LocalDestination {
    root: PathBuf,
}

impl LocalDestination {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a `/`-separated relative path. Paths that would leave
    /// the root are refused.
    pub fn path_for(&self, relative_path: &str) -> Result<PathBuf, TransferError> {
        join_under(&self.root, relative_path)
    }
}

impl DestinationProbe for LocalDestination {
    fn exists(&self, relative_path: &str) -> bool {
        self.path_for(relative_path).is_ok_and(|p| p.exists())
    }

    fn describe(&self, relative_path: &str) -> String {
        match self.path_for(relative_path) {
            Ok(p) => p.display().to_string(),
            Err(_) => relative_path.to_string(),
        }
    }
}

/// Join a `/`-separated relative path under `root`. Every segment must be a
/// plain name; `..`, roots and drive prefixes are rejected.
pub fn join_under(root: &Path, relative_path: &str) -> Result<PathBuf, TransferError> {
    let mut path = root.to_path_buf();
    for seg in relative_path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut parts = Path::new(seg).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => path.push(seg),
            _ => return Err(TransferError::UnsafePath(relative_path.to_string())),
        }
    }
    Ok(path)
}

/// Outcome of the policy for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Proceed,
    Skip(SkipReason),
    Conflict(TransferError),
}

/// Direction-aware existing-artifact policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Skip existing destinations unless `overwrite`.
    Download { overwrite: bool },
    /// Fail on existing destinations unless `replace`.
    Upload { replace: bool },
}

impl SkipPolicy {
    pub fn download(overwrite: bool) -> Self {
        SkipPolicy::Download { overwrite }
    }

    pub fn upload(replace: bool) -> Self {
        SkipPolicy::Upload { replace }
    }

    pub fn decide<P: DestinationProbe + ?Sized>(&self, relative_path: &str, probe: &P) -> SkipDecision {
        match *self {
            SkipPolicy::Download { overwrite: true } | SkipPolicy::Upload { replace: true } => {
                SkipDecision::Proceed
            }
            SkipPolicy::Download { overwrite: false } => {
                if probe.exists(relative_path) {
                    SkipDecision::Skip(SkipReason::AlreadyExists)
                } else {
                    SkipDecision::Proceed
                }
            }
            SkipPolicy::Upload { replace: false } => {
                if probe.exists(relative_path) {
                    SkipDecision::Conflict(TransferError::AlreadyExists(
                        probe.describe(relative_path),
                    ))
                } else {
                    SkipDecision::Proceed
                }
            }
        }
    }

    /// Convenience form of [`decide`](Self::decide) returning only the skip bit.
    pub fn should_skip<P: DestinationProbe + ?Sized>(&self, relative_path: &str, probe: &P) -> bool {
        matches!(self.decide(relative_path, probe), SkipDecision::Skip(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::collections::HashSet;

    struct Existing(HashSet<&'static str>);

    impl DestinationProbe for Existing {
        fn exists(&self, relative_path: &str) -> bool {
            self.0.contains(relative_path)
        }
    }

    #[test]
    fn download_skips_existing_unless_overwrite() {
        let present = Existing(HashSet::from(["a.txt"]));
        let policy = SkipPolicy::download(false);
        assert_eq!(
            policy.decide("a.txt", &present),
            SkipDecision::Skip(SkipReason::AlreadyExists)
        );
        assert!(policy.should_skip("a.txt", &present));
        assert_eq!(policy.decide("b.txt", &present), SkipDecision::Proceed);
        assert_eq!(SkipPolicy::download(true).decide("a.txt", &present), SkipDecision::Proceed);
    }

    #[test]
    fn upload_conflicts_instead_of_skipping() {
        let present = Existing(HashSet::from(["M1"]));
        let decision = SkipPolicy::upload(false).decide("M1", &present);
        assert!(matches!(decision, SkipDecision::Conflict(TransferError::AlreadyExists(_))));
        assert!(!SkipPolicy::upload(false).should_skip("M1", &present));
        assert_eq!(SkipPolicy::upload(true).decide("M1", &present), SkipDecision::Proceed);
    }

    #[test]
    fn local_destination_maps_slash_paths() {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child("sub/x.bin").write_str("x").unwrap();
        let dest = LocalDestination::new(dir.path());
        assert!(dest.exists("sub/x.bin"));
        assert!(!dest.exists("sub/y.bin"));
        assert_eq!(
            dest.path_for("sub/x.bin").unwrap(),
            dir.path().join("sub").join("x.bin")
        );
    }

    #[test]
    fn paths_leaving_the_destination_are_refused() {
        let dir = assert_fs::TempDir::new().unwrap();
        let dest = LocalDestination::new(dir.child("out").path());
        for bad in ["../escaped.txt", "a/../../b", "sub/.."] {
            assert_eq!(
                dest.path_for(bad),
                Err(TransferError::UnsafePath(bad.to_string())),
                "{bad}"
            );
            assert!(!dest.exists(bad));
        }
        assert_eq!(dest.path_for("./a//b").unwrap(), dir.child("out/a/b").path());
    }
}
