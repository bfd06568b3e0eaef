//! Windows implementations of platform helpers (best-effort, no ACL management).

use anyhow::{Context, Result, bail};
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::temp::tmp_sibling_name;

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a new config file via temp file + rename. Fails if the target exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent).with_context(|| format!("create parent '{}'", parent.display()))?;
    let tmp = tmp_sibling_name(path, "config");
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// No-op on Windows; POSIX-style file modes are not applicable.
pub fn set_file_mode_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Approximate octal bits from the readonly flag.
pub fn permission_bits(meta: &Metadata) -> Option<String> {
    let bits = if meta.permissions().readonly() { "444" } else { "644" };
    Some(bits.to_string())
}

/// Ownership is not exposed through std on Windows.
pub fn owner_of(_meta: &Metadata) -> Option<String> {
    None
}

pub fn group_of(_meta: &Metadata) -> Option<String> {
    None
}
