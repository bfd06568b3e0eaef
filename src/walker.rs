//! Local directory enumeration for uploads.
//!
//! Pre-order, depth-first walk (sorted by file name) over a local root. Each
//! directory may carry its own attribute file; when found it becomes the
//! active rule set for that subtree and replaces the inherited one. The active
//! sets live on an explicit stack of `(directory depth, rules)` frames, popped
//! as the walk leaves each subtree.
//!
//! Notes:
//! - Symbolic links are never followed; they surface as leaf candidates.
//! - Hidden entries (leading `.`) are skipped unless `include_hidden` is set.
//! - Attribute files themselves are never candidates.
//! - A directory matched by an explicit ignore rule is pruned.

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::errors::TransferEngineError;
use crate::model::{Action, Candidate};
use crate::platform::{group_of, owner_of, permission_bits};
use crate::rules::{AttributeRuleSet, RuleSourceLoader};

/// Options controlling a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub include_hidden: bool,
    pub max_depth: Option<usize>,
    /// When false only the root's direct children are visited.
    pub recursive: bool,
    /// Rule set that takes precedence over an attribute file at the root.
    pub attributes_override: Option<Arc<AttributeRuleSet>>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            max_depth: None,
            recursive: true,
            attributes_override: None,
        }
    }
}

/// A discovered file plus the rule set that governs it.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub candidate: Candidate,
    pub rules: Arc<AttributeRuleSet>,
    /// Path relative to the rule set's directory, used for rule matching.
    pub rule_path: String,
}

impl WalkedFile {
    /// Classification of this file under its governing rules.
    pub fn action(&self) -> Action {
        self.rules.action_for(&self.rule_path)
    }
}

/// Lazy walk over a local tree. Restart by calling [`walk`] again.
pub struct DirectoryWalk<'a, L: RuleSourceLoader + ?Sized> {
    root: PathBuf,
    entries: walkdir::IntoIter,
    loader: &'a L,
    include_hidden: bool,
    frames: Vec<(usize, Arc<AttributeRuleSet>)>,
}

/// Start walking `root`. The root's rule set is resolved eagerly, so a broken
/// attribute file at the root fails here rather than mid-iteration.
pub fn walk<'a, L: RuleSourceLoader + ?Sized>(
    root: &Path,
    options: &WalkOptions,
    loader: &'a L,
) -> Result<DirectoryWalk<'a, L>, TransferEngineError> {
    if !root.is_dir() {
        return Err(TransferEngineError::Walk {
            path: root.to_path_buf(),
            message: "not a directory".into(),
        });
    }

    let root_rules = match &options.attributes_override {
        Some(rules) => Arc::clone(rules),
        None => match loader.locate(root) {
            Some(file) => Arc::new(loader.load(&file, root)?),
            None => Arc::new(AttributeRuleSet::empty(root, loader.defaults().clone())),
        },
    };

    let max_depth = if options.recursive {
        options.max_depth
    } else {
        Some(1)
    };
    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    debug!(root = %root.display(), ?max_depth, include_hidden = options.include_hidden, "Starting directory walk");
    Ok(DirectoryWalk {
        root: root.to_path_buf(),
        entries: walker.into_iter(),
        loader,
        include_hidden: options.include_hidden,
        frames: vec![(0, root_rules)],
    })
}

impl<L: RuleSourceLoader + ?Sized> DirectoryWalk<'_, L> {
    fn active_rules(&mut self, depth: usize) -> Arc<AttributeRuleSet> {
        // Frames at or below this depth belong to subtrees already left behind.
        while self.frames.len() > 1 && self.frames.last().is_some_and(|(d, _)| *d >= depth) {
            self.frames.pop();
        }
        Arc::clone(&self.frames[self.frames.len() - 1].1)
    }

    fn walk_error(&self, err: walkdir::Error) -> TransferEngineError {
        TransferEngineError::Walk {
            path: err.path().unwrap_or(&self.root).to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl<L: RuleSourceLoader + ?Sized> Iterator for DirectoryWalk<'_, L> {
    type Item = Result<WalkedFile, TransferEngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(self.walk_error(err))),
            };
            let depth = entry.depth();
            if depth == 0 {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_dir();
            if !self.include_hidden && name.starts_with('.') {
                if is_dir {
                    self.entries.skip_current_dir();
                }
                continue;
            }

            let rules = self.active_rules(depth);
            let rule_path = relative_slash_path(entry.path(), rules.base_dir());

            if is_dir {
                if rules.excludes(&rule_path) {
                    debug!(dir = %entry.path().display(), "Pruning excluded directory");
                    self.entries.skip_current_dir();
                    continue;
                }
                if let Some(file) = self.loader.locate(entry.path()) {
                    match self.loader.load(&file, entry.path()) {
                        Ok(nested) => {
                            debug!(dir = %entry.path().display(), "Nested attributes file replaces inherited rules");
                            self.frames.push((depth, Arc::new(nested)));
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                continue;
            }

            if self.loader.is_rule_file(&name) {
                continue;
            }

            let candidate = local_candidate(&self.root, &entry);
            return Some(Ok(WalkedFile {
                candidate,
                rules,
                rule_path,
            }));
        }
    }
}

fn local_candidate(root: &Path, entry: &DirEntry) -> Candidate {
    let mut candidate = Candidate::new(
        relative_slash_path(entry.path(), root),
        entry.path().to_string_lossy(),
    );
    if let Ok(meta) = entry.metadata() {
        candidate.size_bytes = Some(meta.len());
        candidate.permissions = permission_bits(&meta);
        candidate.owner = owner_of(&meta);
        candidate.group = group_of(&meta);
        candidate.modified_at = modified_at(&meta);
    }
    candidate
}

/// Modification time of `meta` as UTC.
pub fn modified_at(meta: &Metadata) -> Option<DateTime<Utc>> {
    let ft = FileTime::from_last_modification_time(meta);
    DateTime::from_timestamp(ft.unix_seconds(), ft.nanoseconds())
}

/// `path` relative to `base`, joined with `/` regardless of platform.
pub fn relative_slash_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
