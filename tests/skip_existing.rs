use assert_fs::prelude::*;
use std::fs;

use zos_transfer::{
    Action, DownloadRequest, FsRuleSourceLoader, LocalNaming, MirrorStore, SkipReason,
    UploadRequest, download_matching, upload_directory,
};

fn seeded_store() -> (assert_fs::TempDir, MirrorStore) {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("HLQ.DATA/A1").write_str("alpha\n").unwrap();
    dir.child("HLQ.DATA/B1").write_str("beta\n").unwrap();
    let store = MirrorStore::new(dir.path());
    (dir, store)
}

#[test]
fn second_download_skips_everything() {
    let (_dir, store) = seeded_store();
    let out = assert_fs::TempDir::new().unwrap();
    let loader = FsRuleSourceLoader::default();
    let req = DownloadRequest::new("HLQ.DATA/*", out.path());
    let target = store.downloader(out.path());

    let first = download_matching(&req, &loader, &store, &target).unwrap();
    assert_eq!(first.succeeded(), 2);

    let second = download_matching(&req, &loader, &store, &target).unwrap();
    assert_eq!(second.succeeded(), 0);
    assert_eq!(second.skipped(), 2);
    assert!(
        second
            .outcomes()
            .iter()
            .all(|o| o.action == Action::skip(SkipReason::AlreadyExists))
    );
}

#[test]
fn overwrite_replaces_local_copies() {
    let (dir, store) = seeded_store();
    let out = assert_fs::TempDir::new().unwrap();
    out.child("a1").write_str("stale").unwrap();
    dir.child("HLQ.DATA/A1").write_str("fresh\n").unwrap();

    let mut req = DownloadRequest::new("HLQ.DATA/A*", out.path());
    req.overwrite = true;
    let report = download_matching(&req, &FsRuleSourceLoader::default(), &store, &store.downloader(out.path())).unwrap();
    assert_eq!(report.succeeded(), 1);
    out.child("a1").assert("fresh\n");
}

#[test]
fn repeated_upload_conflicts_without_touching_remote() {
    let (dir, store) = seeded_store();
    let local = assert_fs::TempDir::new().unwrap();
    local.child("A1").write_str("local edit\n").unwrap();
    local.child("C1").write_str("new\n").unwrap();

    let target = store.uploader("HLQ.DATA").unwrap();
    let req = UploadRequest::new(local.path(), "HLQ.DATA");
    let report = upload_directory(&req, &FsRuleSourceLoader::default(), &target, &target).unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.exit_code(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.candidate.relative_path, "A1");
    assert!(failure.error.as_ref().unwrap().to_string().contains("HLQ.DATA/A1"));
    dir.child("HLQ.DATA/A1").assert("alpha\n");
    dir.child("HLQ.DATA/C1").assert("new\n");
}

#[test]
fn replace_overwrites_remote_members() {
    let (dir, store) = seeded_store();
    let local = assert_fs::TempDir::new().unwrap();
    local.child("A1").write_binary(b"edited\r\n").unwrap();

    let target = store.uploader("HLQ.DATA").unwrap();
    let mut req = UploadRequest::new(local.path(), "HLQ.DATA");
    req.replace = true;
    let report = upload_directory(&req, &FsRuleSourceLoader::default(), &target, &target).unwrap();
    assert!(report.is_success());
    assert_eq!(fs::read(dir.child("HLQ.DATA/A1").path()).unwrap(), b"edited\n");
}

#[test]
fn dataset_naming_options_shape_local_files() {
    let (_dir, store) = seeded_store();
    let out = assert_fs::TempDir::new().unwrap();
    let mut req = DownloadRequest::new("HLQ.DATA/*", out.path());
    req.naming = LocalNaming {
        preserve_original_letter_case: true,
        extension: Some("txt".into()),
        extension_map: [("data".to_string(), "dat".to_string())].into(),
    };
    let report = download_matching(&req, &FsRuleSourceLoader::default(), &store, &store.downloader(out.path())).unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.outcomes()[0].candidate.relative_path, "A1");
    out.child("A1.dat").assert("alpha\n");
    out.child("B1.dat").assert("beta\n");

    // Existing copies are found under the mapped names.
    let again = download_matching(&req, &FsRuleSourceLoader::default(), &store, &store.downloader(out.path())).unwrap();
    assert_eq!(again.skipped(), 2);
}
