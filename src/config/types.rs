//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::rules::{
    DEFAULT_ATTRIBUTES_FILE, EncodingDefaults, FsRuleSourceLoader,
    encoding::{DEFAULT_LOCAL_ENCODING, DEFAULT_REMOTE_ENCODING},
};
use crate::scheduler::Concurrency;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for a transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Local directory backing the remote store
    pub store_root: Option<PathBuf>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Transfers in flight; unset = sequential, 0 = unbounded
    pub max_concurrent_requests: Option<usize>,
    /// Default local encoding for text transfers
    pub local_encoding: String,
    /// Default remote encoding for text transfers
    pub remote_encoding: String,
    /// Attribute file name looked up in each uploaded directory
    pub attributes_file: String,
    pub include_hidden: bool,
    pub fail_fast: bool,
    /// Keep source modification times on downloaded files
    pub preserve_mtime: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: None,
            log_level: LogLevel::Normal,
            log_file: None,
            max_concurrent_requests: None,
            local_encoding: DEFAULT_LOCAL_ENCODING.to_string(),
            remote_encoding: DEFAULT_REMOTE_ENCODING.to_string(),
            attributes_file: DEFAULT_ATTRIBUTES_FILE.to_string(),
            include_hidden: false,
            fail_fast: false,
            preserve_mtime: false,
        }
    }
}

impl Config {
    pub fn encoding_defaults(&self) -> EncodingDefaults {
        EncodingDefaults {
            local: self.local_encoding.clone(),
            remote: self.remote_encoding.clone(),
        }
    }

    /// Attribute file loader honoring the configured file name and encodings.
    pub fn rule_loader(&self) -> FsRuleSourceLoader {
        FsRuleSourceLoader::new(self.attributes_file.clone(), self.encoding_defaults())
    }

    pub fn concurrency(&self) -> Concurrency {
        Concurrency::from_requested(self.max_concurrent_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_aliases() {
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::parse(" verbose "), Some(LogLevel::Info));
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn defaults_are_sequential_with_standard_encodings() {
        let cfg = Config::default();
        assert_eq!(cfg.concurrency(), Concurrency::Sequential);
        assert_eq!(cfg.encoding_defaults(), EncodingDefaults::default());
        assert_eq!(cfg.attributes_file, ".zosattributes");
    }
}
