use assert_fs::prelude::*;
use filetime::{FileTime, set_file_mtime};
use std::time::{Duration, SystemTime};

use zos_transfer::{
    DownloadRequest, EntryType, FilterPredicates, FsRuleSourceLoader, MirrorStore, MtimeFilter,
    download_matching,
};

const DAY: u64 = 24 * 60 * 60;

fn aged_store() -> (assert_fs::TempDir, MirrorStore) {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("u/logs/today.log").write_str("t").unwrap();
    dir.child("u/logs/old.log").write_str("o").unwrap();
    dir.child("u/logs/ancient.log").write_str("a").unwrap();
    let age = |days: u64| FileTime::from_system_time(SystemTime::now() - Duration::from_secs(days * DAY + 60));
    set_file_mtime(dir.child("u/logs/old.log").path(), age(3)).unwrap();
    set_file_mtime(dir.child("u/logs/ancient.log").path(), age(40)).unwrap();
    let store = MirrorStore::new(dir.path());
    (dir, store)
}

fn downloaded_with(mtime: &str) -> Vec<String> {
    let (_dir, store) = aged_store();
    let out = assert_fs::TempDir::new().unwrap();
    let mut req = DownloadRequest::new("u/logs/*.log", out.path());
    req.filters = FilterPredicates {
        mtime: Some(mtime.parse::<MtimeFilter>().unwrap()),
        ..FilterPredicates::default()
    };
    let report = download_matching(&req, &FsRuleSourceLoader::default(), &store, &store.downloader(out.path())).unwrap();
    report
        .outcomes()
        .iter()
        .map(|o| o.candidate.relative_path.clone())
        .collect()
}

#[test]
fn zero_days_keeps_only_fresh_files() {
    assert_eq!(downloaded_with("0"), vec!["today.log"]);
}

#[test]
fn one_day_excludes_fresh_files() {
    assert_eq!(downloaded_with("1"), vec!["ancient.log", "old.log"]);
}

#[test]
fn minus_n_keeps_younger_files() {
    assert_eq!(downloaded_with("-5"), vec!["old.log", "today.log"]);
    assert_eq!(downloaded_with("+30"), vec!["ancient.log"]);
}

#[test]
fn directory_type_filter_plans_nothing_but_creates_dirs() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("u/tree/a/x.txt").write_str("x").unwrap();
    dir.child("u/tree/b/y.txt").write_str("y").unwrap();
    let store = MirrorStore::new(dir.path());
    let out = assert_fs::TempDir::new().unwrap();

    let mut req = DownloadRequest::new("u/tree", out.path());
    req.filters.entry_type = Some(EntryType::Directory);
    let report = download_matching(&req, &FsRuleSourceLoader::default(), &store, &store.downloader(out.path())).unwrap();
    assert_eq!(report.attempted(), 0);
    assert!(out.child("a").path().is_dir());
    assert!(out.child("b").path().is_dir());
    assert!(!out.child("a/x.txt").path().exists());
}
