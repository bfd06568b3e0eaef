//! Directory-mirror store: a remote store emulated by a local directory tree.
//!
//! Remote references are `/`-separated paths under the store root. Datasets
//! map to directories and members to files inside them; USS paths map
//! one-to-one. Binary transfers copy bytes. Text transfers normalize line
//! endings: `\n` on the store side, the platform ending locally.
//!
//! Every write lands in a hidden temp sibling first and is renamed into place,
//! so a failed transfer never leaves a truncated target behind.

use anyhow::{Context, Result, bail};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::engine::RemoteLister;
use crate::errors::TransferError;
use crate::io_help::{io_error_with_help, io_failure};
use crate::matcher;
use crate::model::{Action, Candidate};
use crate::platform::{group_of, owner_of, permission_bits, tmp_sibling_name};
use crate::scheduler::Transfer;
use crate::naming::is_dataset_name;
use crate::skip::{DestinationProbe, LocalDestination, join_under};
use crate::walker::{modified_at, relative_slash_path};

/// A store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
    preserve_mtime: bool,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preserve_mtime: false,
        }
    }

    /// Carry the source modification time onto downloaded files.
    pub fn with_preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path backing `remote_ref`. Rejects references escaping the root.
    pub fn resolve(&self, remote_ref: &str) -> Result<PathBuf, TransferError> {
        join_under(&self.root, remote_ref)
            .map_err(|_| TransferError::Remote(format!("invalid remote reference '{remote_ref}'")))
    }

    /// Transfer target for uploads into `destination` (a dataset or directory reference).
    pub fn uploader(&self, destination: &str) -> Result<MirrorUpload, TransferError> {
        Ok(MirrorUpload {
            destination: destination.trim_matches('/').to_string(),
            target_dir: self.resolve(destination)?,
        })
    }

    /// Transfer target for downloads into the local directory `destination`.
    pub fn downloader(&self, destination: impl Into<PathBuf>) -> MirrorDownload {
        MirrorDownload {
            store: self.clone(),
            destination: LocalDestination::new(destination),
        }
    }
}

impl RemoteLister for MirrorStore {
    fn list(&self, pattern: &str) -> Result<Vec<Candidate>> {
        let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let literal = segments
            .iter()
            .take_while(|s| !matcher::has_wildcards(s))
            .count();
        let base_ref = segments[..literal].join("/");
        let remainder = segments[literal..].join("/");

        let base = self.resolve(&base_ref)?;
        let meta = fs::metadata(&base).map_err(io_error_with_help("list", &base))?;

        if meta.is_file() {
            if !remainder.is_empty() {
                bail!("'{base_ref}' is not a dataset or directory");
            }
            let name = segments.last().copied().unwrap_or_default();
            return Ok(vec![remote_candidate(name, base_ref, false, &meta)]);
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1).follow_links(false).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Listing '{base_ref}'"))?;
            let rel = relative_slash_path(entry.path(), &base);
            if !remainder.is_empty() && !matcher::matches(&remainder, &rel) {
                continue;
            }
            let meta = entry
                .metadata()
                .with_context(|| format!("Reading metadata for '{rel}'"))?;
            let reference = if base_ref.is_empty() {
                rel.clone()
            } else {
                format!("{base_ref}/{rel}")
            };
            out.push(remote_candidate(&rel, reference, entry.file_type().is_dir(), &meta));
        }
        debug!(pattern, base = %base_ref, found = out.len(), "Listed store");
        Ok(out)
    }
}

fn remote_candidate(rel: &str, reference: String, is_directory: bool, meta: &fs::Metadata) -> Candidate {
    let top = reference.split('/').next().unwrap_or_default();
    let dataset = is_dataset_name(top).then(|| top.to_string());
    let mut c = Candidate::new(rel, reference);
    c.dataset = dataset;
    c.is_directory = is_directory;
    if !is_directory {
        c.size_bytes = Some(meta.len());
    }
    c.permissions = permission_bits(meta);
    c.owner = owner_of(meta);
    c.group = group_of(meta);
    c.modified_at = modified_at(meta);
    c
}

/// Uploads into one dataset or directory of the store.
#[derive(Debug, Clone)]
pub struct MirrorUpload {
    destination: String,
    target_dir: PathBuf,
}

impl MirrorUpload {
    fn target_for(&self, relative_path: &str) -> Result<PathBuf, TransferError> {
        join_under(&self.target_dir, relative_path)
    }
}

impl DestinationProbe for MirrorUpload {
    fn exists(&self, relative_path: &str) -> bool {
        self.target_for(relative_path).is_ok_and(|p| p.exists())
    }

    fn describe(&self, relative_path: &str) -> String {
        if self.destination.is_empty() {
            relative_path.to_string()
        } else {
            format!("{}/{}", self.destination, relative_path)
        }
    }
}

impl Transfer for MirrorUpload {
    fn transfer(&self, candidate: &Candidate, action: &Action) -> Result<(), TransferError> {
        let src = Path::new(&candidate.reference);
        let dst = self.target_for(&candidate.relative_path)?;
        let bytes = fs::read(src).map_err(io_failure("read local file", src))?;
        let payload = match action {
            Action::TransferText {
                local_encoding,
                remote_encoding,
            } => {
                trace!(path = %candidate.relative_path, local = %local_encoding, remote = %remote_encoding, "Text upload");
                to_lf(&bytes)
            }
            Action::TransferBinary => bytes,
            Action::Skip { .. } => return Ok(()),
        };
        write_replacing(&dst, &payload)
    }
}

/// Downloads from the store into a local directory.
#[derive(Debug, Clone)]
pub struct MirrorDownload {
    store: MirrorStore,
    destination: LocalDestination,
}

impl MirrorDownload {
    pub fn destination(&self) -> &LocalDestination {
        &self.destination
    }
}

impl Transfer for MirrorDownload {
    fn transfer(&self, candidate: &Candidate, action: &Action) -> Result<(), TransferError> {
        let src = self.store.resolve(&candidate.reference)?;
        let dst = self.destination.path_for(candidate.target())?;
        let bytes = fs::read(&src).map_err(io_failure("read remote item", &src))?;
        let payload = match action {
            Action::TransferText {
                local_encoding,
                remote_encoding,
            } => {
                trace!(path = %candidate.relative_path, local = %local_encoding, remote = %remote_encoding, "Text download");
                to_platform_newlines(&bytes)
            }
            Action::TransferBinary => bytes,
            Action::Skip { .. } => return Ok(()),
        };
        write_replacing(&dst, &payload)?;

        if self.store.preserve_mtime {
            let meta = fs::metadata(&src).map_err(io_failure("stat remote item", &src))?;
            let mtime = FileTime::from_last_modification_time(&meta);
            filetime::set_file_mtime(&dst, mtime).map_err(io_failure("set modification time", &dst))?;
        }
        Ok(())
    }
}

/// Write `bytes` to `dst` through a temp sibling and rename.
fn write_replacing(dst: &Path, bytes: &[u8]) -> Result<(), TransferError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(io_failure("create directory", parent))?;
    }
    let tmp = tmp_sibling_name(dst, "transfer");
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(io_failure("write temp file", &tmp)(e));
    }
    if let Err(e) = fs::rename(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        return Err(io_failure("rename into place", dst)(e));
    }
    Ok(())
}

/// Collapse CRLF to LF.
fn to_lf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(windows)]
fn to_platform_newlines(bytes: &[u8]) -> Vec<u8> {
    let lf = to_lf(bytes);
    let mut out = Vec::with_capacity(lf.len() + lf.len() / 16);
    for &b in &lf {
        if b == b'\n' {
            out.push(b'\r');
        }
        out.push(b);
    }
    out
}

#[cfg(not(windows))]
fn to_platform_newlines(bytes: &[u8]) -> Vec<u8> {
    to_lf(bytes)
}
