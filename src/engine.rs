//! Bulk transfer entry points.
//!
//! Both directions build a complete plan first (walk or listing, rules,
//! filters, existing-artifact policy) and only then hand it to the scheduler.
//! Anything fatal, such as a malformed attributes file or a failed listing,
//! therefore aborts before the first transfer starts.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::TransferEngineError;
use crate::filter::{FilterPredicates, filter};
use crate::model::{Action, Candidate};
use crate::naming::LocalNaming;
use crate::report::TransferReport;
use crate::rules::{AttributeRuleSet, EncodingDefaults, RuleSourceLoader};
use crate::scheduler::{Concurrency, PlannedTransfer, Transfer, TransferScheduler};
use crate::shutdown;
use crate::skip::{DestinationProbe, LocalDestination, SkipDecision, SkipPolicy};
use crate::walker::{WalkOptions, WalkedFile, walk};

/// Enumerates remote items matching a pattern.
pub trait RemoteLister: Sync {
    fn list(&self, pattern: &str) -> anyhow::Result<Vec<Candidate>>;
}

impl<F> RemoteLister for F
where
    F: Fn(&str) -> anyhow::Result<Vec<Candidate>> + Sync,
{
    fn list(&self, pattern: &str) -> anyhow::Result<Vec<Candidate>> {
        self(pattern)
    }
}

/// Parameters of a local-directory upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub root: PathBuf,
    /// Remote dataset or directory receiving the files.
    pub destination: String,
    /// Attributes file overriding the one found at `root`.
    pub attributes: Option<PathBuf>,
    pub concurrency: Concurrency,
    pub recursive: bool,
    pub include_hidden: bool,
    pub max_depth: Option<usize>,
    /// Overwrite existing remote artifacts instead of failing on them.
    pub replace: bool,
    pub fail_fast: bool,
    /// Transfer every non-ignored file as binary.
    pub binary: bool,
    /// Per-file transfer mode by base name; wins over `binary` for the listed files.
    pub files_map: Option<FilesMap>,
}

/// Base names uploaded in one fixed mode: binary, or text with the rule's
/// (or the default) encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesMap {
    pub binary: bool,
    pub file_names: Vec<String>,
}

impl FilesMap {
    pub fn contains(&self, name: &str) -> bool {
        self.file_names.iter().any(|n| n == name)
    }
}

impl UploadRequest {
    pub fn new(root: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            destination: destination.into(),
            attributes: None,
            concurrency: Concurrency::default(),
            recursive: true,
            include_hidden: false,
            max_depth: None,
            replace: false,
            fail_fast: false,
            binary: false,
            files_map: None,
        }
    }
}

/// Parameters of a pattern download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub pattern: String,
    /// Local directory receiving the items.
    pub destination: PathBuf,
    pub filters: FilterPredicates,
    pub concurrency: Concurrency,
    /// Replace existing local files instead of skipping them.
    pub overwrite: bool,
    pub fail_fast: bool,
    pub binary: bool,
    /// Attributes file classifying downloaded items; patterns are relative to `destination`.
    pub attributes: Option<PathBuf>,
    /// Local names for dataset items.
    pub naming: LocalNaming,
}

impl DownloadRequest {
    pub fn new(pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            destination: destination.into(),
            filters: FilterPredicates::default(),
            concurrency: Concurrency::default(),
            overwrite: false,
            fail_fast: false,
            binary: false,
            attributes: None,
            naming: LocalNaming::default(),
        }
    }
}

/// Upload the tree under `request.root` into `request.destination`.
///
/// `remote` answers whether an artifact already exists remotely; `transfer`
/// moves one file.
pub fn upload_directory<L, P, T>(
    request: &UploadRequest,
    loader: &L,
    remote: &P,
    transfer: &T,
) -> Result<TransferReport, TransferEngineError>
where
    L: RuleSourceLoader + ?Sized,
    P: DestinationProbe + ?Sized,
    T: Transfer + ?Sized,
{
    if shutdown::is_requested() {
        return Err(TransferEngineError::Interrupted);
    }

    let attributes_override = match &request.attributes {
        Some(path) => Some(Arc::new(loader.load(path, &request.root)?)),
        None => None,
    };
    let options = WalkOptions {
        include_hidden: request.include_hidden,
        max_depth: request.max_depth,
        recursive: request.recursive,
        attributes_override,
    };

    let files: Vec<WalkedFile> = walk(&request.root, &options, loader)?.collect::<Result<_, _>>()?;
    info!(
        root = %request.root.display(),
        destination = %request.destination,
        files = files.len(),
        "Planned upload"
    );

    let policy = SkipPolicy::upload(request.replace);
    let plan: Vec<PlannedTransfer> = files
        .into_iter()
        .map(|file| {
            let action = upload_action(&file, request, loader.defaults());
            plan_item(file.candidate, action, policy, remote)
        })
        .collect();

    let report = TransferScheduler::new(request.concurrency)
        .with_fail_fast(request.fail_fast)
        .run(plan, transfer)?;
    info!(
        succeeded = report.succeeded(),
        skipped = report.skipped(),
        failed = report.failed(),
        cancelled = report.cancelled(),
        "Upload finished"
    );
    Ok(report)
}

/// Download everything `lister` returns for `request.pattern` that passes the
/// filters into `request.destination`. Directories are created locally but are
/// not counted as items.
pub fn download_matching<L, R, T>(
    request: &DownloadRequest,
    loader: &L,
    lister: &R,
    transfer: &T,
) -> Result<TransferReport, TransferEngineError>
where
    L: RuleSourceLoader + ?Sized,
    R: RemoteLister + ?Sized,
    T: Transfer + ?Sized,
{
    if shutdown::is_requested() {
        return Err(TransferEngineError::Interrupted);
    }

    let rules = match &request.attributes {
        Some(path) => loader.load(path, &request.destination)?,
        None => AttributeRuleSet::empty(&request.destination, loader.defaults().clone()),
    };

    let listed = lister
        .list(&request.pattern)
        .map_err(|e| TransferEngineError::CandidateDiscovery(format!("{e:#}")))?;
    debug!(pattern = %request.pattern, listed = listed.len(), "Listing complete");

    fs::create_dir_all(&request.destination).map_err(|e| TransferEngineError::Destination {
        path: request.destination.clone(),
        message: e.to_string(),
    })?;
    let local = LocalDestination::new(&request.destination);
    let policy = SkipPolicy::download(request.overwrite);

    let mut plan = Vec::new();
    for mut candidate in filter(listed, &request.filters, Utc::now()) {
        candidate.target_path = request.naming.target_for(&candidate);
        let action = force_binary(rules.action_for(&candidate.relative_path), request.binary);
        let target = match local.path_for(candidate.target()) {
            Ok(target) => target,
            Err(err) => {
                warn!(path = %candidate.relative_path, error = %err, "Refusing listed item");
                plan.push(PlannedTransfer::rejected(candidate, action, err));
                continue;
            }
        };
        if candidate.is_directory {
            if let Err(e) = fs::create_dir_all(&target) {
                warn!(dir = %target.display(), error = %e, "Could not create local directory");
            }
            continue;
        }
        plan.push(plan_item(candidate, action, policy, &local));
    }
    info!(
        pattern = %request.pattern,
        destination = %request.destination.display(),
        items = plan.len(),
        "Planned download"
    );

    let report = TransferScheduler::new(request.concurrency)
        .with_fail_fast(request.fail_fast)
        .run(plan, transfer)?;
    info!(
        succeeded = report.succeeded(),
        skipped = report.skipped(),
        failed = report.failed(),
        cancelled = report.cancelled(),
        "Download finished"
    );
    Ok(report)
}

fn upload_action(file: &WalkedFile, request: &UploadRequest, defaults: &EncodingDefaults) -> Action {
    let action = file.action();
    let Some(map) = request
        .files_map
        .as_ref()
        .filter(|m| !action.is_skip() && m.contains(file.candidate.name()))
    else {
        return force_binary(action, request.binary);
    };
    match action {
        _ if map.binary => Action::TransferBinary,
        Action::TransferText { .. } => action,
        _ => Action::TransferText {
            local_encoding: defaults.local.clone(),
            remote_encoding: defaults.remote.clone(),
        },
    }
}

fn force_binary(action: Action, binary: bool) -> Action {
    if binary && !action.is_skip() {
        Action::TransferBinary
    } else {
        action
    }
}

fn plan_item<P: DestinationProbe + ?Sized>(
    candidate: Candidate,
    action: Action,
    policy: SkipPolicy,
    probe: &P,
) -> PlannedTransfer {
    if action.is_skip() {
        return PlannedTransfer::new(candidate, action);
    }
    match policy.decide(candidate.target(), probe) {
        SkipDecision::Proceed => PlannedTransfer::new(candidate, action),
        SkipDecision::Skip(reason) => PlannedTransfer::new(candidate, Action::skip(reason)),
        SkipDecision::Conflict(err) => PlannedTransfer::rejected(candidate, action, err),
    }
}
