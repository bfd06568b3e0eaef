//! The shutdown flag is process-wide and one-way, so these tests live in
//! their own binary and all observe it set.

use assert_fs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use zos_transfer::shutdown;
use zos_transfer::{
    Action, Candidate, Concurrency, DownloadRequest, FsRuleSourceLoader, MirrorStore,
    PlannedTransfer, SkipReason, TransferEngineError, TransferError, TransferScheduler,
    UploadRequest, download_matching, upload_directory,
};

#[test]
fn entry_points_refuse_to_start_after_interrupt() {
    shutdown::request();
    let store_dir = assert_fs::TempDir::new().unwrap();
    let local = assert_fs::TempDir::new().unwrap();
    local.child("a.txt").write_str("a").unwrap();
    let store = MirrorStore::new(store_dir.path());
    let loader = FsRuleSourceLoader::default();

    let target = store.uploader("u/dir").unwrap();
    let up = upload_directory(&UploadRequest::new(local.path(), "u/dir"), &loader, &target, &target);
    assert!(matches!(up, Err(TransferEngineError::Interrupted)));
    assert!(!store_dir.child("u/dir/a.txt").path().exists());

    let out = assert_fs::TempDir::new().unwrap();
    let down = download_matching(
        &DownloadRequest::new("u/dir/*", out.path()),
        &loader,
        &store,
        &store.downloader(out.path()),
    );
    assert!(matches!(down, Err(TransferEngineError::Interrupted)));
}

#[test]
fn scheduler_cancels_unstarted_items_after_interrupt() {
    shutdown::request();
    let plan: Vec<PlannedTransfer> = ["x", "y", "z"]
        .iter()
        .map(|n| PlannedTransfer::new(Candidate::new(*n, *n), Action::TransferBinary))
        .collect();
    let calls = AtomicUsize::new(0);
    let transfer = |_: &Candidate, _: &Action| -> Result<(), TransferError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };

    for concurrency in [Concurrency::Sequential, Concurrency::from_requested(Some(2))] {
        let report = TransferScheduler::new(concurrency)
            .run(plan.clone(), &transfer)
            .unwrap();
        assert_eq!(report.cancelled(), 3);
        assert_eq!(report.failed(), 0);
        assert!(
            report
                .outcomes()
                .iter()
                .all(|o| o.action == Action::skip(SkipReason::Cancelled))
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
