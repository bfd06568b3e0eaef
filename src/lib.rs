//! Core library for `zos_transfer`.
//!
//! Bulk transfer of files between a local filesystem and a hierarchical remote
//! store (datasets, partitioned-dataset members, USS trees): attribute rules
//! decide per file whether it is skipped, sent as text, or sent as binary; a
//! bounded scheduler runs the transfers; the aggregator reports the outcome.
//!
//! Public API:
//! - upload_directory / download_matching: bulk entry points
//! - TransferScheduler, TransferReport: execution and results
//! - AttributeRuleSet, FsRuleSourceLoader: `.zosattributes` rules
//! - MirrorStore: a remote store backed by a local directory tree
//! - Config, LogLevel: runtime configuration

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod io_help;
pub mod matcher;
pub mod model;
pub mod naming;
pub mod output;
pub mod platform;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod shutdown;
pub mod skip;
pub mod store;
pub mod walker;

pub use config::{Config, LogLevel, config_path, default_log_path, path_has_symlink_ancestor};
pub use engine::{
    DownloadRequest, FilesMap, RemoteLister, UploadRequest, download_matching, upload_directory,
};
pub use errors::{TransferEngineError, TransferError};
pub use filter::{EntryType, FilterPredicates, MtimeFilter, SizeFilter};
pub use model::{Action, Candidate, SkipReason};
pub use naming::LocalNaming;
pub use report::{ResultAggregator, TransferOutcome, TransferReport, aggregate};
pub use rules::{AttributeRuleSet, EncodingDefaults, FsRuleSourceLoader, Rule, RuleSourceLoader};
pub use scheduler::{Concurrency, PlannedTransfer, Transfer, TransferScheduler};
pub use skip::{DestinationProbe, LocalDestination, SkipDecision, SkipPolicy};
pub use store::MirrorStore;
pub use walker::{WalkOptions, WalkedFile, walk};
