//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{APP_DIR, CONFIG_ENV};

/// Config file in use: `ZOS_TRANSFER_CONFIG` if set (relative values resolve
/// against the working directory), else the OS config dir.
pub fn config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        let p = PathBuf::from(p);
        if p.is_absolute() {
            return Ok(p);
        }
        return Ok(env::current_dir()?.join(p));
    }
    let base = config_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| anyhow!("cannot determine a config directory; set {CONFIG_ENV}"))?;
    Ok(base.join(APP_DIR).join("config.xml"))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    let base = data_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .ok_or_else(|| anyhow!("cannot determine a data directory"))?;
    Ok(base.join(APP_DIR).join("zos_transfer.log"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
