//! Config validation logic.
//! Verifies encodings, the attribute file name, and prepares the store root.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::types::Config;
use crate::rules::is_known_encoding;

/// Validate `cfg` and normalize its paths in place.
///
/// - encodings must be known tokens; they are stored upper-cased
/// - `attributes_file` must be a bare file name
/// - `store_root` is created if missing and canonicalized
pub fn validate_and_normalize(cfg: &mut Config) -> Result<()> {
    for (name, value) in [
        ("local_encoding", &mut cfg.local_encoding),
        ("remote_encoding", &mut cfg.remote_encoding),
    ] {
        if !is_known_encoding(value) {
            error!("{name} is not a known encoding: {value}");
            bail!("{name} '{value}' is not a known encoding");
        }
        *value = value.to_ascii_uppercase();
    }

    let attrs = cfg.attributes_file.as_str();
    if attrs.is_empty() || attrs.contains(['/', '\\']) || attrs == "." || attrs == ".." {
        bail!("attributes_file must be a plain file name, got '{attrs}'");
    }

    let Some(root) = cfg.store_root.as_ref() else {
        bail!("store_root is not configured; set it in config.xml or pass --store-root");
    };
    ensure_dir_is_or_create(root, "store_root")?;
    let canonical = dunce::canonicalize(root)
        .with_context(|| format!("Failed to resolve store_root '{}'", root.display()))?;
    debug!(store_root = %canonical.display(), "store_root resolved");
    cfg.store_root = Some(canonical);

    info!(
        store_root = %cfg.store_root.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
        local_encoding = %cfg.local_encoding,
        remote_encoding = %cfg.remote_encoding,
        "Config validated"
    );
    Ok(())
}

/// Ensure directory exists (create if missing). If exists, it must be a directory.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {name} directory '{}'", path.display()))?;
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}
