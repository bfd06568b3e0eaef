//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a secure template on request (`--init-config`).
//!
//! Notes:
//! - This module only reads/writes the config file; value validation happens elsewhere.
//! - Unknown XML fields are a hard error to surface misconfigurations early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};
use crate::rules::DEFAULT_ATTRIBUTES_FILE;
use crate::rules::encoding::{DEFAULT_LOCAL_ENCODING, DEFAULT_REMOTE_ENCODING};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    store_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_usize_trimmed_opt")]
    max_concurrent_requests: Option<usize>,
    local_encoding: Option<String>,
    remote_encoding: Option<String>,
    attributes_file: Option<String>,
    include_hidden: Option<bool>,
    fail_fast: Option<bool>,
    preserve_mtime: Option<bool>,
}

// Trims surrounding whitespace; empty means unset.
fn de_usize_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<usize>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// Map XmlConfig -> Config; unset fields keep their defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    cfg.store_root = non_empty(parsed.store_root).map(PathBuf::from);
    cfg.log_file = non_empty(parsed.log_file).map(PathBuf::from);
    if let Some(s) = non_empty(parsed.log_level) {
        cfg.log_level = s.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    cfg.max_concurrent_requests = parsed.max_concurrent_requests;
    if let Some(s) = non_empty(parsed.local_encoding) {
        cfg.local_encoding = s;
    }
    if let Some(s) = non_empty(parsed.remote_encoding) {
        cfg.remote_encoding = s;
    }
    if let Some(s) = non_empty(parsed.attributes_file) {
        cfg.attributes_file = s;
    }
    cfg.include_hidden = parsed.include_hidden.unwrap_or(false);
    cfg.fail_fast = parsed.fail_fast.unwrap_or(false);
    cfg.preserve_mtime = parsed.preserve_mtime.unwrap_or(false);

    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in config xml '{}'", path.display()))
}

/// Load the config in use. Returns Ok(None) when the file does not exist.
pub fn load_config() -> Result<Option<(PathBuf, Config)>> {
    let path = config_path()?;
    if !path.exists() {
        debug!(path = %path.display(), "No config file; using defaults");
        return Ok(None);
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), "Loaded config");
    Ok(Some((path, cfg)))
}

/// Create a template config file and its parent directory (best-effort permissions).
/// Uses secure creation to avoid following attacker-controlled symlinks on Unix.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite existing config at {}", path.display());
    }
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/zos_transfer.log".into());

    let content = format!(
        "<!--\n  zos_transfer configuration (XML)\n\n  Fields:\n    store_root               -> directory backing the remote store (datasets are directories, members are files)\n    log_level                -> quiet | normal | info | debug\n    log_file                 -> path to log file (optional; stdout still used)\n    max_concurrent_requests  -> transfers in flight (omit for sequential, 0 = unbounded)\n    local_encoding           -> default local code page for text transfers\n    remote_encoding          -> default remote code page for text transfers\n    attributes_file          -> attribute file name looked up in uploaded directories\n    include_hidden           -> upload dotfiles too (true/false)\n    fail_fast                -> stop dispatching after the first failure (true/false)\n    preserve_mtime           -> keep remote modification times on downloads (true/false)\n\n  CLI flags override XML values.\n-->\n<config>\n  <store_root></store_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <local_encoding>{}</local_encoding>\n  <remote_encoding>{}</remote_encoding>\n  <attributes_file>{}</attributes_file>\n  <include_hidden>false</include_hidden>\n  <fail_fast>false</fail_fast>\n  <preserve_mtime>false</preserve_mtime>\n</config>\n",
        suggested_log, DEFAULT_LOCAL_ENCODING, DEFAULT_REMOTE_ENCODING, DEFAULT_ATTRIBUTES_FILE
    );

    // Atomic, secure write (O_NOFOLLOW + create_new on Unix), then tighten perms.
    write_config_secure_new_0600(path, content.as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!("Created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn reads_all_fields() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.xml");
        file.write_str(
            "<config>\n  <store_root> /srv/mirror </store_root>\n  <log_level>debug</log_level>\n  <max_concurrent_requests> 4 </max_concurrent_requests>\n  <local_encoding>UTF-8</local_encoding>\n  <attributes_file>.attrs</attributes_file>\n  <fail_fast>true</fail_fast>\n  <preserve_mtime>true</preserve_mtime>\n</config>\n",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(file.path()).unwrap();
        assert_eq!(cfg.store_root, Some(PathBuf::from("/srv/mirror")));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.max_concurrent_requests, Some(4));
        assert_eq!(cfg.local_encoding, "UTF-8");
        assert_eq!(cfg.remote_encoding, DEFAULT_REMOTE_ENCODING);
        assert_eq!(cfg.attributes_file, ".attrs");
        assert!(cfg.fail_fast);
        assert!(cfg.preserve_mtime);
        assert!(!cfg.include_hidden);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.xml");
        file.write_str("<config><download_base>/x</download_base></config>")
            .unwrap();
        let err = load_config_from_xml_path(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"), "got: {err:#}");
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.xml");
        file.write_str("<config><log_level>loud</log_level></config>").unwrap();
        assert!(load_config_from_xml_path(file.path()).is_err());
    }

    #[test]
    fn template_round_trips_through_loader() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.store_root, None);
        assert_eq!(cfg.attributes_file, DEFAULT_ATTRIBUTES_FILE);
        assert!(create_template_config(&path).is_err(), "existing file must not be clobbered");
    }
}
