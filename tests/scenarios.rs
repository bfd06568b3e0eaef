use assert_fs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use zos_transfer::{
    Action, Candidate, Concurrency, DownloadRequest, FilterPredicates, FsRuleSourceLoader,
    MirrorStore, PlannedTransfer, SizeFilter, SkipReason, TransferError, TransferScheduler,
    UploadRequest, download_matching, upload_directory,
};

#[test]
fn ignored_files_are_skipped_on_upload() {
    let store_dir = assert_fs::TempDir::new().unwrap();
    let local = assert_fs::TempDir::new().unwrap();
    local.child(".zosattributes").write_str("*.ignoreme -\n").unwrap();
    local.child("foo.ignoreme").write_str("skip me").unwrap();
    local.child("bar.txt").write_str("keep me\n").unwrap();

    let store = MirrorStore::new(store_dir.path());
    let target = store.uploader("u/user/dir").unwrap();
    let req = UploadRequest::new(local.path(), "u/user/dir");
    let report = upload_directory(&req, &FsRuleSourceLoader::default(), &target, &target).unwrap();

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 0);
    store_dir.child("u/user/dir/bar.txt").assert("keep me\n");
    assert!(!store_dir.child("u/user/dir/foo.ignoreme").path().exists());
}

#[test]
fn members_round_trip_with_bounded_concurrency() {
    let store_dir = assert_fs::TempDir::new().unwrap();
    let local = assert_fs::TempDir::new().unwrap();
    for m in ["M1", "M2", "M3"] {
        local.child(m).write_str(&format!("member {m}\n")).unwrap();
    }
    let store = MirrorStore::new(store_dir.path());
    let loader = FsRuleSourceLoader::default();

    let target = store.uploader("HLQ.SRC.PDS").unwrap();
    let up = UploadRequest::new(local.path(), "HLQ.SRC.PDS");
    let report = upload_directory(&up, &loader, &target, &target).unwrap();
    assert_eq!(report.succeeded(), 3);

    let out = assert_fs::TempDir::new().unwrap();
    let mut down = DownloadRequest::new("HLQ.SRC.PDS/M*", out.path());
    down.concurrency = Concurrency::from_requested(Some(2));
    let report = download_matching(&down, &loader, &store, &store.downloader(out.path())).unwrap();
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.succeeded(), 3);
    out.child("m2").assert("member M2\n");
}

#[test]
fn size_predicate_selects_large_enough_candidates() {
    let listing = |_: &str| -> anyhow::Result<Vec<Candidate>> {
        let mut big = Candidate::new("foo.png", "u/img/foo.png");
        big.size_bytes = Some(2048);
        let mut small = Candidate::new("small.png", "u/img/small.png");
        small.size_bytes = Some(512);
        Ok(vec![big, small])
    };
    let seen = std::sync::Mutex::new(Vec::new());
    let transfer = |c: &Candidate, _: &Action| -> Result<(), TransferError> {
        seen.lock().unwrap().push(c.relative_path.clone());
        Ok(())
    };
    let out = assert_fs::TempDir::new().unwrap();
    let mut req = DownloadRequest::new("u/img/*.png", out.path());
    req.filters = FilterPredicates {
        size: Some("+1K".parse::<SizeFilter>().unwrap()),
        ..FilterPredicates::default()
    };
    let report = download_matching(&req, &FsRuleSourceLoader::default(), &listing, &transfer).unwrap();
    assert_eq!(report.attempted(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["foo.png"]);
}

#[test]
fn fail_fast_stops_dispatch_after_first_failure() {
    let plan: Vec<PlannedTransfer> = (1..=5)
        .map(|i| PlannedTransfer::new(Candidate::new(format!("c{i}"), format!("c{i}")), Action::TransferBinary))
        .collect();
    let calls = AtomicUsize::new(0);
    let transfer = |c: &Candidate, _: &Action| -> Result<(), TransferError> {
        calls.fetch_add(1, Ordering::SeqCst);
        if c.relative_path == "c2" {
            return Err(TransferError::Remote("rejected".into()));
        }
        std::thread::sleep(std::time::Duration::from_millis(30));
        Ok(())
    };

    let report = TransferScheduler::new(Concurrency::from_requested(Some(2)))
        .with_fail_fast(true)
        .run(plan, &transfer)
        .unwrap();

    assert!(report.failed() >= 1);
    assert!(report.cancelled() >= 1, "expected cancelled items, got {report:?}");
    assert!(calls.load(Ordering::SeqCst) < 5);
    assert_eq!(
        report.attempted(),
        report.succeeded() + report.skipped() + report.failed() + report.cancelled()
    );
    let cancelled_are_marked = report
        .outcomes()
        .iter()
        .filter(|o| o.action == Action::skip(SkipReason::Cancelled))
        .count();
    assert_eq!(cancelled_are_marked, report.cancelled());
}
