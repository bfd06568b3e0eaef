//! Attribute rules: per-path classification into skip, text or binary.
//!
//! An attribute file (default name `.zosattributes`) binds an ordered rule list
//! to its directory. Resolution is first-match-wins in file order; a path that
//! matches nothing gets the default text rule built from the configured
//! encodings. Rule sets are immutable once loaded and shared behind `Arc`.

pub mod encoding;
mod parse;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::TransferEngineError;
use crate::matcher;
use crate::model::{Action, SkipReason};

pub use encoding::{EncodingDefaults, is_known_encoding};
pub use parse::{RowError, parse_rules};

/// Default attribute file name looked up in every walked directory.
pub const DEFAULT_ATTRIBUTES_FILE: &str = ".zosattributes";

/// One classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub ignore: bool,
    pub binary: bool,
    pub local_encoding: Option<String>,
    pub remote_encoding: Option<String>,
}

impl Rule {
    pub fn ignored(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore: true,
            binary: false,
            local_encoding: None,
            remote_encoding: None,
        }
    }

    pub fn binary(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore: false,
            binary: true,
            local_encoding: None,
            remote_encoding: None,
        }
    }

    pub fn text(
        pattern: impl Into<String>,
        local_encoding: Option<String>,
        remote_encoding: Option<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            ignore: false,
            binary: false,
            local_encoding,
            remote_encoding,
        }
    }
}

/// Ordered rules bound to a directory, plus the fallback rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRuleSet {
    base_dir: PathBuf,
    origin: Option<PathBuf>,
    rules: Vec<Rule>,
    default_rule: Rule,
    defaults: EncodingDefaults,
}

impl AttributeRuleSet {
    pub fn new(base_dir: impl Into<PathBuf>, rules: Vec<Rule>, defaults: EncodingDefaults) -> Self {
        let default_rule = Rule::text(
            "*",
            Some(defaults.local.clone()),
            Some(defaults.remote.clone()),
        );
        Self {
            base_dir: base_dir.into(),
            origin: None,
            rules,
            default_rule,
            defaults,
        }
    }

    /// A rule set with no rules: every path resolves to the default text rule.
    pub fn empty(base_dir: impl Into<PathBuf>, defaults: EncodingDefaults) -> Self {
        Self::new(base_dir, Vec::new(), defaults)
    }

    /// Parse `text` as an attribute file located at `origin`.
    pub fn parse(
        text: &str,
        origin: &Path,
        base_dir: impl Into<PathBuf>,
        defaults: EncodingDefaults,
    ) -> Result<Self, TransferEngineError> {
        let rules = parse_rules(text).map_err(|e| TransferEngineError::RuleSyntax {
            path: origin.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;
        let mut set = Self::new(base_dir, rules, defaults);
        set.origin = Some(origin.to_path_buf());
        Ok(set)
    }

    /// Directory the rules' patterns are relative to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Attribute file the rules came from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule in file order whose pattern matches, if any.
    pub fn find(&self, relative_path: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| matcher::matches(&r.pattern, relative_path))
    }

    /// Effective rule for `relative_path` (first match or the default).
    pub fn resolve(&self, relative_path: &str) -> &Rule {
        self.find(relative_path).unwrap_or(&self.default_rule)
    }

    /// Action for `relative_path`; ignore wins over any other column, and a
    /// text rule whose two encodings are equal transfers as binary.
    pub fn action_for(&self, relative_path: &str) -> Action {
        let rule = self.resolve(relative_path);
        if rule.ignore {
            return Action::skip(SkipReason::AttributeExcluded);
        }
        if rule.binary {
            return Action::TransferBinary;
        }
        let local = rule.local_encoding.as_ref().unwrap_or(&self.defaults.local);
        let remote = rule.remote_encoding.as_ref().unwrap_or(&self.defaults.remote);
        // No conversion between identical encodings: move the bytes as-is.
        if local.eq_ignore_ascii_case(remote) {
            return Action::TransferBinary;
        }
        Action::TransferText {
            local_encoding: local.clone(),
            remote_encoding: remote.clone(),
        }
    }

    /// True when an explicit ignore rule matches `relative_path`.
    pub fn excludes(&self, relative_path: &str) -> bool {
        self.find(relative_path).is_some_and(|r| r.ignore)
    }
}

/// Locates and loads attribute files.
pub trait RuleSourceLoader: Sync {
    /// Attribute file for `dir`, if one exists there.
    fn locate(&self, dir: &Path) -> Option<PathBuf>;

    /// Load the file at `path`; patterns are relative to `base_dir`.
    fn load(&self, path: &Path, base_dir: &Path) -> Result<AttributeRuleSet, TransferEngineError>;

    /// Encodings applied when no rule names one.
    fn defaults(&self) -> &EncodingDefaults;

    /// True when `name` is the attribute file name this loader looks for.
    fn is_rule_file(&self, name: &str) -> bool;
}

/// Filesystem loader looking for a fixed file name in each directory.
#[derive(Debug, Clone)]
pub struct FsRuleSourceLoader {
    file_name: String,
    defaults: EncodingDefaults,
}

impl FsRuleSourceLoader {
    pub fn new(file_name: impl Into<String>, defaults: EncodingDefaults) -> Self {
        Self {
            file_name: file_name.into(),
            defaults,
        }
    }
}

impl Default for FsRuleSourceLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ATTRIBUTES_FILE, EncodingDefaults::default())
    }
}

impl RuleSourceLoader for FsRuleSourceLoader {
    fn locate(&self, dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(&self.file_name);
        candidate.is_file().then_some(candidate)
    }

    fn load(&self, path: &Path, base_dir: &Path) -> Result<AttributeRuleSet, TransferEngineError> {
        let text = fs::read_to_string(path).map_err(|e| TransferEngineError::AttributesUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let set = AttributeRuleSet::parse(&text, path, base_dir, self.defaults.clone())?;
        debug!(path = %path.display(), rules = set.rules().len(), "Loaded attributes file");
        Ok(set)
    }

    fn defaults(&self) -> &EncodingDefaults {
        &self.defaults
    }

    fn is_rule_file(&self, name: &str) -> bool {
        name == self.file_name
    }
}
