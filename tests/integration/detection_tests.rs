use dupeguard::detection::{
    classify, gather_originals, hash_file, Check, DetectionSettings, FileFacts, HashAlgorithm,
    PatternMatcher,
};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn write_aged(path: &Path, content: &[u8], age: Duration) {
    fs::write(path, content).unwrap();
    let when = SystemTime::now() - age;
    set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

#[test]
fn test_default_pattern_candidates() {
    let matcher = PatternMatcher::default();
    assert!(matcher.is_candidate("invoice-1.pdf"));
    assert!(matcher.is_candidate("scan-2024-12.png"));
    assert!(!matcher.is_candidate("invoice.pdf"));
    assert!(!matcher.is_candidate("invoice (1).pdf"));
    assert!(!matcher.is_candidate("README"));
}

#[test]
fn test_custom_pattern_still_needs_numeric_suffix() {
    let matcher = PatternMatcher::new(&[".*".to_string()]);
    assert!(matcher.is_candidate("photo-3.jpg"));
    assert!(!matcher.is_candidate("photo.jpg"));
}

#[test]
fn test_invalid_patterns_are_skipped() {
    let matcher = PatternMatcher::new(&["(unclosed".to_string(), r".*\.pdf".to_string()]);
    assert_eq!(matcher.len(), 1);
    assert!(matcher.is_candidate("a-1.pdf"));
    assert!(!matcher.is_candidate("a-1.txt"));
}

#[test]
fn test_gather_originals_order() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    for name in ["report.pdf", "report-2.pdf", "report-1.pdf", "report-3.pdf", "other.pdf"] {
        fs::write(d.join(name), name).unwrap();
    }

    let originals = gather_originals(&d.join("report-3.pdf"));
    assert_eq!(
        originals,
        vec![d.join("report.pdf"), d.join("report-1.pdf"), d.join("report-2.pdf")]
    );
}

#[test]
fn test_gather_originals_without_base_file() {
    let dir = tempdir().unwrap();
    let d = dir.path();
    fs::write(d.join("notes-1.txt"), b"a").unwrap();
    fs::write(d.join("notes-2.txt"), b"a").unwrap();

    assert_eq!(gather_originals(&d.join("notes-2.txt")), vec![d.join("notes-1.txt")]);
}

#[test]
fn test_size_match_is_duplicate() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.txt");
    let candidate = dir.path().join("a-1.txt");
    fs::write(&original, b"same size").unwrap();
    fs::write(&candidate, b"SAME SIZE").unwrap();

    let facts = FileFacts::probe(&candidate).unwrap();
    let verdict = classify(&facts, &original, &DetectionSettings::default());
    assert!(verdict.is_duplicate);
    assert_eq!(verdict.passed, vec![Check::Size]);
    assert_eq!(verdict.reason, "size matches (9 bytes)");
}

#[test]
fn test_size_mismatch_short_circuits() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.txt");
    let candidate = dir.path().join("a-1.txt");
    fs::write(&original, b"12345").unwrap();
    fs::write(&candidate, b"123").unwrap();

    let settings = DetectionSettings::default().with_hash(Some(HashAlgorithm::Sha256));
    let facts = FileFacts::probe(&candidate).unwrap();
    let verdict = classify(&facts, &original, &settings);
    assert!(!verdict.is_duplicate);
    assert!(verdict.passed.is_empty());
    assert_eq!(verdict.reason, "size mismatch (3 vs 5 bytes)");
}

#[cfg(unix)]
#[test]
fn test_time_window_uses_file_timestamps() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.txt");
    let candidate = dir.path().join("a-1.txt");
    write_aged(&original, b"xx", Duration::from_secs(20));
    write_aged(&candidate, b"xx", Duration::from_secs(10));
    let facts = FileFacts::probe(&candidate).unwrap();

    let wide = DetectionSettings::default().with_time_window(Some(60));
    let verdict = classify(&facts, &original, &wide);
    assert!(verdict.is_duplicate);
    assert_eq!(verdict.passed, vec![Check::Size, Check::Time]);
    assert!(verdict.reason.contains("time within 10.0s"), "{}", verdict.reason);

    let narrow = DetectionSettings::default().with_time_window(Some(5));
    let verdict = classify(&facts, &original, &narrow);
    assert!(!verdict.is_duplicate);
    assert_eq!(verdict.passed, vec![Check::Size]);
    assert_eq!(verdict.reason, "time outside window (10.0s > 5s)");
}

#[test]
fn test_hash_distinguishes_same_size_files() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.bin");
    let same = dir.path().join("a-1.bin");
    let different = dir.path().join("a-2.bin");
    fs::write(&original, b"abcdef").unwrap();
    fs::write(&same, b"abcdef").unwrap();
    fs::write(&different, b"abcdeg").unwrap();

    for algorithm in HashAlgorithm::ALL {
        let settings = DetectionSettings::default().with_hash(Some(algorithm));

        let verdict = classify(&FileFacts::probe(&same).unwrap(), &original, &settings);
        assert!(verdict.is_duplicate, "{algorithm}");
        assert_eq!(verdict.passed, vec![Check::Size, Check::Hash]);

        let verdict = classify(&FileFacts::probe(&different).unwrap(), &original, &settings);
        assert!(!verdict.is_duplicate, "{algorithm}");
        assert_eq!(verdict.reason, format!("{algorithm} hash mismatch"));
    }
}

#[test]
fn test_vanished_original_is_not_a_match() {
    let dir = tempdir().unwrap();
    let candidate = dir.path().join("a-1.txt");
    fs::write(&candidate, b"x").unwrap();

    let facts = FileFacts::probe(&candidate).unwrap();
    let verdict = classify(&facts, &dir.path().join("a.txt"), &DetectionSettings::default());
    assert!(!verdict.is_duplicate);
    assert!(verdict.reason.starts_with("original unavailable"));
}

#[test]
fn test_known_digests() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("abc.txt");
    fs::write(&path, b"abc").unwrap();

    assert_eq!(
        hash_file(&path, HashAlgorithm::Md5).unwrap(),
        "900150983cd24fb0d6963f7d28e17f72"
    );
    assert_eq!(
        hash_file(&path, HashAlgorithm::Sha1).unwrap(),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
    assert_eq!(
        hash_file(&path, HashAlgorithm::Sha256).unwrap(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
