use std::fs;
use std::path::Path;
use std::sync::Arc;

use cleanmate_core::{
    CleanConfig, CleanError, DeletionErrorKind, FixedProbe, PathValidator, PathWhitelist,
    Privilege, ProgressEvent, ProgressPhase, ScanEntry,
};
use cleanmate_ops::{CleanService, CleanUpdate, CleanupLock, DeletionEngine, start_clean};
use cleanmate_scan::RecursiveScanner;
use tempfile::TempDir;

fn populate(root: &Path) -> u64 {
    fs::create_dir_all(root.join("cache/a/b")).unwrap();
    fs::create_dir_all(root.join("logs")).unwrap();
    let files = [
        ("top.tmp", 100usize),
        ("cache/one.bin", 2000),
        ("cache/a/two.bin", 3000),
        ("cache/a/b/three.bin", 4000),
        ("logs/app.log", 500),
    ];
    for (name, size) in files {
        fs::write(root.join(name), vec![7u8; size]).unwrap();
    }
    files.iter().map(|(_, size)| *size as u64).sum()
}

fn service_for(root: &Path) -> CleanService {
    let whitelist = PathWhitelist::new().register("temp", [root], Privilege::User);
    CleanService::new(whitelist, CleanConfig::default())
        .with_probe(FixedProbe(false))
        .with_lock(Arc::new(CleanupLock::new()))
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn test_analyze_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let written = populate(temp.path());
    let service = service_for(temp.path());

    let first = service.analyze(&mut |_| {}).await.unwrap();
    let second = service.analyze(&mut |_| {}).await.unwrap();

    assert_eq!(first.result.total_recoverable_bytes, written);
    assert_eq!(first.result.file_count, 5);
    assert_eq!(first.result.file_count, second.result.file_count);
    assert_eq!(
        first.result.total_recoverable_bytes,
        second.result.total_recoverable_bytes
    );
    assert!(first.warnings.is_empty());
}

#[tokio::test]
async fn test_analyze_progress_ends_at_100() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = service_for(temp.path());

    let mut events: Vec<ProgressEvent> = Vec::new();
    service.analyze(&mut |e| events.push(e)).await.unwrap();

    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.phase == ProgressPhase::Scanning));
    assert!(events.windows(2).all(|w| w[0].percent_complete <= w[1].percent_complete));
    assert_eq!(events.last().unwrap().percent_complete, 100);
}

#[tokio::test]
async fn test_conservation_law() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = service_for(temp.path());

    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    let cleanup = service.clean(&mut |_| {}).await.unwrap();
    let outcome = &cleanup.outcome;

    assert!(outcome.freed_bytes <= analysis.result.total_recoverable_bytes);
    if outcome.errors.is_empty() && outcome.items_vanished == 0 {
        assert_eq!(outcome.freed_bytes, analysis.result.total_recoverable_bytes);
    }
    assert_eq!(cleanup.scanned_bytes, analysis.result.total_recoverable_bytes);
}

#[cfg(unix)]
#[tokio::test]
async fn test_conservation_law_with_followed_links() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("real")).unwrap();
    fs::write(root.join("real/file.tmp"), vec![3u8; 1000]).unwrap();
    std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();

    let whitelist = PathWhitelist::new().register("temp", [root], Privilege::User);
    let config = CleanConfig {
        follow_symlinks: true,
        ..CleanConfig::default()
    };
    let service = CleanService::new(whitelist, config)
        .with_probe(FixedProbe(false))
        .with_lock(Arc::new(CleanupLock::new()));

    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.total_recoverable_bytes, 1000);

    let outcome = service.clean(&mut |_| {}).await.unwrap().outcome;
    assert!(outcome.is_success());
    assert_eq!(outcome.items_vanished, 0);
    assert_eq!(outcome.items_deleted, 3);
    assert_eq!(outcome.freed_bytes, analysis.result.total_recoverable_bytes);
    assert!(is_empty_dir(root));
}

#[tokio::test]
async fn test_clean_removes_contents_but_keeps_root() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = service_for(temp.path());

    let cleanup = service.clean(&mut |_| {}).await.unwrap();

    assert!(cleanup.outcome.is_success());
    assert!(temp.path().exists());
    assert!(is_empty_dir(temp.path()));

    let again = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(again.result.file_count, 0);
}

#[tokio::test]
async fn test_deletion_runs_deepest_first() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let validator = PathValidator::new([temp.path()]);

    let entries = RecursiveScanner::new()
        .scan(temp.path(), "temp", &validator)
        .await
        .unwrap();
    let planned = DeletionEngine::plan(entries.clone());

    let lengths: Vec<usize> = planned.iter().map(|e| e.path.as_os_str().len()).collect();
    assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    for (i, entry) in planned.iter().enumerate() {
        let parent_first = planned[..i]
            .iter()
            .any(|earlier| earlier.is_dir() && entry.path.starts_with(&earlier.path));
        assert!(!parent_first, "{} planned after its parent", entry.path.display());
    }

    // Had a parent gone first, its children would be reported as vanished.
    let service = service_for(temp.path());
    let outcome = service.clean_entries(entries.clone(), &mut |_| {}).await.unwrap().outcome;
    assert_eq!(outcome.items_vanished, 0);
    assert_eq!(outcome.items_deleted, entries.len() as u64);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_cleans_are_mutually_exclusive() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = service_for(temp.path());

    let mut first_sink = |_: ProgressEvent| {};
    let mut second_sink = |_: ProgressEvent| {};
    let (first, second) = tokio::join!(
        service.clean(&mut first_sink),
        service.clean(&mut second_sink)
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(CleanError::AlreadyRunning)))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 1);
    assert!(!service.lock().is_held());
}

#[tokio::test]
async fn test_held_lock_rejects_without_side_effects() {
    let temp = TempDir::new().unwrap();
    let written = populate(temp.path());
    let service = service_for(temp.path());

    let permit = service.lock().try_acquire().unwrap();
    let err = service.clean(&mut |_| {}).await.unwrap_err();
    assert!(matches!(err, CleanError::AlreadyRunning));
    assert!(err.is_retryable());
    drop(permit);

    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.total_recoverable_bytes, written);
}

#[tokio::test]
async fn test_missing_root_is_empty_not_an_error() {
    let temp = TempDir::new().unwrap();
    let service = service_for(&temp.path().join("does-not-exist"));

    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.file_count, 0);
    assert_eq!(analysis.result.total_recoverable_bytes, 0);

    let cleanup = service.clean(&mut |_| {}).await.unwrap();
    assert_eq!(cleanup.outcome.items_deleted, 0);
    assert!(cleanup.outcome.is_success());
}

#[tokio::test]
async fn test_unknown_target_fails_the_call() {
    let temp = TempDir::new().unwrap();
    let service = service_for(temp.path());

    let err = service
        .analyze_targets(&["nope".to_string()], &mut |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CleanError::UnknownTarget { ref name } if name == "nope"));
}

#[tokio::test]
async fn test_elevated_target_is_withheld_with_warning() {
    let user_root = TempDir::new().unwrap();
    let admin_root = TempDir::new().unwrap();
    populate(user_root.path());
    populate(admin_root.path());

    let whitelist = PathWhitelist::new()
        .register("temp", [user_root.path()], Privilege::User)
        .register("system-logs", [admin_root.path()], Privilege::Elevated);
    let config = CleanConfig::default();

    let plain = CleanService::new(whitelist.clone(), config.clone())
        .with_probe(FixedProbe(false))
        .with_lock(Arc::new(CleanupLock::new()));
    let analysis = plain.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.file_count, 5);
    assert_eq!(analysis.warnings.len(), 1);
    assert!(analysis.warnings[0].contains("system-logs"));

    let admin = CleanService::new(whitelist, config)
        .with_probe(FixedProbe(true))
        .with_lock(Arc::new(CleanupLock::new()));
    let analysis = admin.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.file_count, 10);
    assert!(analysis.warnings.is_empty());
    assert_eq!(analysis.result.category_totals.len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_read_only_file_is_deleted_or_reported() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("pinned.tmp");
    fs::write(&file, vec![1u8; 64]).unwrap();
    fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();
    let service = service_for(temp.path());

    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.read_only_entries.len(), 1);
    assert!(analysis.result.read_only_entries[0].path.ends_with("pinned.tmp"));

    let outcome = service.clean(&mut |_| {}).await.unwrap().outcome;
    let deleted = !file.exists();
    let reported = outcome.errors.iter().any(|e| e.path.ends_with("pinned.tmp"));
    assert!(deleted != reported, "deleted={deleted} reported={reported}");
}

#[tokio::test]
async fn test_entries_outside_roots_are_denied() {
    let allowed = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let victim = outside.path().join("keep.txt");
    fs::write(&victim, "important").unwrap();
    let service = service_for(allowed.path());

    let entries = vec![ScanEntry::file(&victim, 9, true, "temp")];
    let outcome = service.clean_entries(entries, &mut |_| {}).await.unwrap().outcome;

    assert!(victim.exists());
    assert_eq!(outcome.freed_bytes, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, DeletionErrorKind::Denied);
}

#[tokio::test]
async fn test_traversal_entry_is_denied() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    let sibling = temp.path().join("sibling.txt");
    fs::write(&sibling, "x").unwrap();
    let service = service_for(&root);

    let sneaky = root.join("..").join("sibling.txt");
    let outcome = service
        .clean_entries(vec![ScanEntry::file(sneaky, 1, true, "temp")], &mut |_| {})
        .await
        .unwrap()
        .outcome;

    assert!(sibling.exists());
    assert_eq!(outcome.errors[0].kind, DeletionErrorKind::Denied);
}

#[tokio::test]
async fn test_vanished_items_are_not_errors() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("here.tmp"), vec![0u8; 10]).unwrap();
    let service = service_for(temp.path());

    let entries = vec![
        ScanEntry::file(temp.path().join("here.tmp"), 10, true, "temp"),
        ScanEntry::file(temp.path().join("gone.tmp"), 99, true, "temp"),
        ScanEntry::file(temp.path().join("gone-dir/child.tmp"), 5, true, "temp"),
    ];
    let mut events = Vec::new();
    let outcome = service
        .clean_entries(entries, &mut |e| events.push(e))
        .await
        .unwrap()
        .outcome;

    assert!(outcome.is_success());
    assert_eq!(outcome.items_deleted, 1);
    assert_eq!(outcome.items_vanished, 2);
    assert_eq!(outcome.freed_bytes, 10);
    assert_eq!(events.len(), 3);
    assert_eq!(events.last().unwrap().percent_complete, 100);
}

#[tokio::test]
async fn test_clean_reports_scanning_then_deleting() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = service_for(temp.path());

    let mut events: Vec<ProgressEvent> = Vec::new();
    service.clean(&mut |e| events.push(e)).await.unwrap();

    let split = events
        .iter()
        .position(|e| e.phase == ProgressPhase::Deleting)
        .expect("deleting events");
    let (scanning, deleting) = events.split_at(split);

    assert!(!scanning.is_empty());
    assert!(scanning.iter().all(|e| e.phase == ProgressPhase::Scanning));
    assert!(deleting.iter().all(|e| e.phase == ProgressPhase::Deleting));
    for phase in [scanning, deleting] {
        assert!(phase.windows(2).all(|w| w[0].percent_complete <= w[1].percent_complete));
        assert_eq!(phase.last().unwrap().percent_complete, 100);
    }
}

#[tokio::test]
async fn test_start_clean_streams_progress_then_completes() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let service = Arc::new(service_for(temp.path()));

    let mut rx = start_clean(service);
    let mut deleting = Vec::new();
    let mut completed = None;
    while let Some(update) = rx.recv().await {
        match update {
            CleanUpdate::Progress(event) => {
                if event.phase == ProgressPhase::Deleting {
                    deleting.push(event.percent_complete);
                } else {
                    assert!(deleting.is_empty(), "scanning event after deletion began");
                }
            }
            CleanUpdate::Complete(result) => completed = Some(result),
        }
    }

    let cleanup = completed.expect("completion message").unwrap();
    assert!(cleanup.outcome.is_success());
    assert!(deleting.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(deleting.last().copied(), Some(100));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_ten_thousand_files_with_one_locked() {
    use std::os::unix::fs::PermissionsExt;

    const PER_DIR: usize = 2000;
    const SIZE: usize = 16;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for d in 0..5 {
        let dir = root.join(format!("sub{d}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..PER_DIR {
            fs::write(dir.join(format!("f{f:04}.tmp")), [0u8; SIZE]).unwrap();
        }
    }
    // A file whose directory forbids unlinking stands in for a locked file.
    let locked_dir = root.join("locked");
    fs::create_dir(&locked_dir).unwrap();
    fs::write(locked_dir.join("held.tmp"), [0u8; SIZE]).unwrap();
    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();

    let service = service_for(root);
    let analysis = service.analyze(&mut |_| {}).await.unwrap();
    assert_eq!(analysis.result.file_count, 10_001);
    let written = (10_001 * SIZE) as u64;
    assert_eq!(analysis.result.total_recoverable_bytes, written);

    let outcome = service.clean(&mut |_| {}).await.unwrap().outcome;

    // Privileged runs remove the directory along with its contents.
    if locked_dir.exists() {
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    if outcome.errors.is_empty() {
        // Privileged runs can unlink anything.
        assert_eq!(outcome.items_deleted, 10_001 + 6);
        assert_eq!(outcome.freed_bytes, written);
        assert!(is_empty_dir(root));
    } else {
        assert!(outcome.errors.iter().any(|e| e.path.ends_with("locked/held.tmp")));
        assert_eq!(outcome.items_deleted, 10_000 + 5);
        assert_eq!(outcome.freed_bytes, written - SIZE as u64);
    }
    assert!(root.exists());
}
