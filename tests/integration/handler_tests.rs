use dupeguard::config::Config;
use dupeguard::detection::{DetectionSettings, HashAlgorithm, PatternMatcher};
use dupeguard::monitor::{DuplicateHandler, HandleOutcome};
use dupeguard::quarantine::{sidecar_path, QuarantineManager, RestoreInfo};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// `invoice.pdf` created at T and a 2048-byte or 4096-byte `invoice-1.pdf`
/// created at T+10s, with creation times pinned through the mtime.
#[cfg(unix)]
fn invoice_pair(d: &Path, copy_size: usize) {
    use filetime::{set_file_mtime, FileTime};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let t = SystemTime::now() - Duration::from_secs(120);
    let t = t.duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
    fs::write(d.join("invoice.pdf"), vec![7u8; 2048]).unwrap();
    fs::write(d.join("invoice-1.pdf"), vec![7u8; copy_size]).unwrap();
    set_file_mtime(d.join("invoice.pdf"), FileTime::from_unix_time(t, 0)).unwrap();
    set_file_mtime(d.join("invoice-1.pdf"), FileTime::from_unix_time(t + 10, 0)).unwrap();
}

fn handler(root: &Path, settings: DetectionSettings, dry_run: bool) -> DuplicateHandler {
    DuplicateHandler::new(
        PatternMatcher::default(),
        settings,
        QuarantineManager::new(root.join("q"))
            .with_home(None)
            .with_dry_run(dry_run),
    )
}

#[test]
fn test_falls_through_to_numbered_sibling() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    fs::write(d.join("photo.jpg"), b"original").unwrap();
    fs::write(d.join("photo-1.jpg"), b"edited copy").unwrap();
    fs::write(d.join("photo-2.jpg"), b"edited copy").unwrap();

    let h = handler(d, DetectionSettings::default(), false);
    let outcome = h.on_created(&d.join("photo-2.jpg"), false);

    let HandleOutcome::Quarantined { record, .. } = outcome else {
        panic!("expected quarantine, got {outcome:?}");
    };
    assert_eq!(record.info.reason, "Duplicate of photo-1.jpg");
    assert!(d.join("photo.jpg").exists());
    assert!(d.join("photo-1.jpg").exists());
}

#[test]
fn test_hash_check_rejects_same_size_different_content() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    fs::write(d.join("a.txt"), b"aaaa").unwrap();
    fs::write(d.join("a-1.txt"), b"bbbb").unwrap();

    let settings = DetectionSettings::default().with_hash(Some(HashAlgorithm::Sha256));
    let h = handler(d, settings, false);
    let outcome = h.on_created(&d.join("a-1.txt"), false);

    assert!(matches!(outcome, HandleOutcome::NoDuplicate));
    assert!(d.join("a-1.txt").exists());
    let snap = h.stats().snapshot();
    assert_eq!(snap.files_checked, 1);
    assert_eq!(snap.duplicates_found, 0);
}

#[test]
fn test_dry_run_counts_duplicate_but_keeps_file() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    fs::write(d.join("a.txt"), b"same").unwrap();
    fs::write(d.join("a-1.txt"), b"same").unwrap();

    let h = handler(d, DetectionSettings::default(), true);
    let outcome = h.on_created(&d.join("a-1.txt"), false);

    assert!(matches!(outcome, HandleOutcome::DryRun { ref original, .. } if *original == d.join("a.txt")));
    assert!(outcome.is_duplicate());
    assert!(d.join("a-1.txt").exists());
    assert!(!d.join("q").exists());

    let snap = h.stats().snapshot();
    assert_eq!(snap.duplicates_found, 1);
    assert_eq!(snap.quarantined, 0);
}

#[test]
fn test_from_config_uses_configured_patterns_and_root() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    let config = Config {
        watched_folders: vec![d.join("w")],
        quarantine_path: d.join("quarantine"),
        file_patterns: vec![r".*\.pdf".to_string()],
        ..Config::default()
    };
    fs::create_dir(d.join("w")).unwrap();
    for name in ["a.txt", "a-1.txt", "b.pdf", "b-1.pdf"] {
        fs::write(d.join("w").join(name), b"same").unwrap();
    }

    let h = DuplicateHandler::from_config(&config);
    assert!(matches!(
        h.on_created(&d.join("w").join("a-1.txt"), false),
        HandleOutcome::Skipped
    ));
    let outcome = h.on_created(&d.join("w").join("b-1.pdf"), false);
    let HandleOutcome::Quarantined { record, .. } = outcome else {
        panic!("expected quarantine, got {outcome:?}");
    };
    assert!(record.destination.starts_with(d.join("quarantine")));
    assert!(record.destination.ends_with(Path::new("w").join("b-1.pdf")));
}

#[cfg(unix)]
#[test]
fn test_invoice_copy_within_window_is_quarantined() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    invoice_pair(d, 2048);

    let settings = DetectionSettings::default().with_time_window(Some(300));
    let h = handler(d, settings, false);
    let outcome = h.on_created(&d.join("invoice-1.pdf"), false);

    let HandleOutcome::Quarantined { record, trail } = outcome else {
        panic!("expected quarantine, got {outcome:?}");
    };
    assert_eq!(trail, "size matches (2048 bytes); time within 10.0s");
    assert!(!d.join("invoice-1.pdf").exists());
    assert!(d.join("invoice.pdf").exists());
    assert!(record.destination.starts_with(d.join("q")));
    assert_eq!(
        record.destination.file_name().unwrap().to_str(),
        Some("invoice-1.pdf")
    );
    assert_eq!(fs::read(&record.destination).unwrap(), vec![7u8; 2048]);

    let sidecar = fs::read_to_string(sidecar_path(&record.destination)).unwrap();
    let lines: Vec<&str> = sidecar.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        format!("Original path: {}", d.join("invoice-1.pdf").display())
    );
    assert!(lines[1].starts_with("Quarantined: "));
    assert_eq!(lines[2], "Reason: Duplicate of invoice.pdf");
    assert_eq!(lines[3], "Size: 2048 bytes");

    let info = RestoreInfo::parse(&sidecar).unwrap();
    assert!(info.quarantined_at.is_some());
    assert_eq!(info.size, Some(2048));

    let snap = h.stats().snapshot();
    assert_eq!(snap.files_checked, 1);
    assert_eq!(snap.duplicates_found, 1);
    assert_eq!(snap.quarantined, 1);
}

#[cfg(unix)]
#[test]
fn test_invoice_copy_with_other_size_stays_put() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    invoice_pair(d, 4096);

    let settings = DetectionSettings::default().with_time_window(Some(300));
    let h = handler(d, settings, false);
    let outcome = h.on_created(&d.join("invoice-1.pdf"), false);

    assert!(matches!(outcome, HandleOutcome::NoDuplicate));
    assert_eq!(fs::read(d.join("invoice-1.pdf")).unwrap().len(), 4096);
    assert!(!sidecar_path(&d.join("invoice-1.pdf")).exists());
    assert!(!d.join("q").exists());
    assert_eq!(h.stats().snapshot().duplicates_found, 0);
}

#[test]
fn test_restore_undoes_handler_quarantine() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    let content = b"quarterly numbers".to_vec();
    fs::write(d.join("invoice.pdf"), &content).unwrap();
    fs::write(d.join("invoice-1.pdf"), &content).unwrap();

    let settings = DetectionSettings::default().with_hash(Some(HashAlgorithm::Sha256));
    let h = handler(d, settings, false);
    let outcome = h.on_created(&d.join("invoice-1.pdf"), false);
    let HandleOutcome::Quarantined { record, trail } = outcome else {
        panic!("expected quarantine, got {outcome:?}");
    };
    assert_eq!(trail, "size matches (17 bytes); sha256 hash matches");
    assert!(!d.join("invoice-1.pdf").exists());

    let restored = h.quarantine().restore("invoice-1.pdf").unwrap();
    assert_eq!(restored.to, d.join("invoice-1.pdf"));
    assert_eq!(fs::read(d.join("invoice-1.pdf")).unwrap(), content);
    assert!(!record.destination.exists());
    assert!(!record.sidecar.exists());
    assert!(h.quarantine().list().is_empty());
}

