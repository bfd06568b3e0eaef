//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Flags left unset keep the value from config.xml (or the built-in default).

use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::engine::FilesMap;
use crate::filter::{EntryType, FilterPredicates, MtimeFilter, SizeFilter};
use crate::naming::{LocalNaming, parse_extension_map};

/// Bulk transfer of z/OS datasets, members and USS trees.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Bulk transfer of z/OS datasets, members and USS trees")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory backing the remote store (overrides config.xml).
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub store_root: Option<PathBuf>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, global = true, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where zos_transfer will look for the config file, then exit.
    #[arg(long, help = "Print the config file location used by zos_transfer and exit")]
    pub print_config: bool,

    /// Write a template config.xml at the config location, then exit.
    #[arg(long, help = "Write a template config file and exit")]
    pub init_config: bool,

    /// Transfers in flight; 0 = one per item. Sequential when unset.
    #[arg(long = "max-concurrent-requests", visible_alias = "mcr", global = true, value_name = "N")]
    pub max_concurrent_requests: Option<usize>,

    /// Stop dispatching new transfers after the first failure.
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Print the full report as JSON on stdout instead of the summary.
    #[arg(long, global = true)]
    pub report_json: bool,

    /// Default local encoding for text transfers.
    #[arg(long, global = true, value_name = "ENCODING")]
    pub local_encoding: Option<String>,

    /// Default remote encoding for text transfers.
    #[arg(long, global = true, value_name = "ENCODING")]
    pub remote_encoding: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upload a local directory tree into a dataset or USS directory.
    UploadDir(UploadArgs),
    /// Download remote items matching a pattern into a local directory.
    Download(DownloadArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UploadArgs {
    /// Local directory to upload.
    #[arg(value_name = "LOCAL_DIR", value_hint = ValueHint::DirPath)]
    pub local_dir: PathBuf,

    /// Remote dataset or directory, e.g. `HLQ.SRC.PDS` or `u/user/dir`.
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// Attributes file to use instead of the one at the root of LOCAL_DIR.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub attributes: Option<PathBuf>,

    /// Only upload the direct children of LOCAL_DIR.
    #[arg(long)]
    pub no_recursive: bool,

    /// Maximum directory depth to descend.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Upload hidden (dot) files too.
    #[arg(long)]
    pub include_hidden: bool,

    /// Overwrite existing remote artifacts instead of failing on them.
    #[arg(long)]
    pub replace: bool,

    /// Transfer every non-ignored file as binary.
    #[arg(short = 'b', long)]
    pub binary: bool,

    /// Comma-separated base names always uploaded as binary.
    #[arg(long, value_delimiter = ',', value_name = "NAMES", conflicts_with = "ascii_files")]
    pub binary_files: Vec<String>,

    /// Comma-separated base names always uploaded as text.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub ascii_files: Vec<String>,
}

impl UploadArgs {
    /// Per-file transfer mode from `--binary-files` / `--ascii-files`.
    pub fn files_map(&self) -> Option<FilesMap> {
        let (binary, names) = if !self.binary_files.is_empty() {
            (true, &self.binary_files)
        } else if !self.ascii_files.is_empty() {
            (false, &self.ascii_files)
        } else {
            return None;
        };
        Some(FilesMap {
            binary,
            file_names: names.iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect(),
        })
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DownloadArgs {
    /// Remote pattern, e.g. `HLQ.PDS/M*` or `u/user/dir/*.txt`.
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// Local directory receiving the items.
    #[arg(value_name = "DIRECTORY", value_hint = ValueHint::DirPath)]
    pub directory: PathBuf,

    /// Replace existing local files instead of skipping them.
    #[arg(long)]
    pub overwrite: bool,

    /// Transfer every item as binary.
    #[arg(short = 'b', long)]
    pub binary: bool,

    /// Attributes file classifying downloaded items.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub attributes: Option<PathBuf>,

    /// Keep remote modification times on downloaded files.
    #[arg(long)]
    pub preserve_mtime: bool,

    /// Keep dataset and member names in upper case locally.
    #[arg(long)]
    pub preserve_original_letter_case: bool,

    /// Extension appended to downloaded dataset items, e.g. `txt`.
    #[arg(short = 'e', long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Extension per low-level qualifier, e.g. `cbl=cob,cntl=jcl`.
    #[arg(long, value_name = "LLQ=EXT,...", value_parser = parse_extension_map)]
    pub extension_map: Option<BTreeMap<String, String>>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

impl DownloadArgs {
    pub fn naming(&self) -> LocalNaming {
        LocalNaming {
            preserve_original_letter_case: self.preserve_original_letter_case,
            extension: self.extension.clone(),
            extension_map: self.extension_map.clone().unwrap_or_default(),
        }
    }
}

/// Post-listing filters, all AND-combined.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Size: `+N` at least, `-N` at most, `N` exactly; units K, M, G, T.
    #[arg(long, allow_hyphen_values = true, value_name = "SIZE")]
    pub size: Option<SizeFilter>,

    /// Exact octal permission bits, e.g. 755.
    #[arg(long = "perm", value_name = "MODE")]
    pub permission: Option<String>,

    /// Exact owner.
    #[arg(long)]
    pub owner: Option<String>,

    /// Exact group.
    #[arg(long)]
    pub group: Option<String>,

    /// Exact or wildcard match on the item name.
    #[arg(long)]
    pub name: Option<String>,

    /// Age in days: `0` today, `N`/`+N` at least N days, `-N` fewer than N days.
    #[arg(long, allow_hyphen_values = true, value_name = "DAYS")]
    pub mtime: Option<MtimeFilter>,

    /// Entry type: f (files) or d (directories).
    #[arg(long = "type", value_name = "f|d")]
    pub entry_type: Option<EntryType>,

    /// Maximum depth below the listing base.
    #[arg(long, value_name = "N")]
    pub depth: Option<usize>,
}

impl FilterArgs {
    pub fn predicates(&self) -> FilterPredicates {
        FilterPredicates {
            pattern: None,
            size: self.size,
            permission: self.permission.clone(),
            owner: self.owner.clone(),
            group: self.group.clone(),
            name: self.name.clone(),
            mtime: self.mtime,
            entry_type: self.entry_type,
            depth: self.depth,
        }
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(root) = &self.store_root {
            cfg.store_root = Some(root.clone());
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(n) = self.max_concurrent_requests {
            cfg.max_concurrent_requests = Some(n);
        }
        if self.fail_fast {
            cfg.fail_fast = true;
        }
        if let Some(enc) = &self.local_encoding {
            cfg.local_encoding = enc.clone();
        }
        if let Some(enc) = &self.remote_encoding {
            cfg.remote_encoding = enc.clone();
        }
        match &self.command {
            Some(Command::UploadDir(up)) if up.include_hidden => cfg.include_hidden = true,
            Some(Command::Download(down)) if down.preserve_mtime => cfg.preserve_mtime = true,
            _ => {}
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
