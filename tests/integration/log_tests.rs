use chrono::{Local, TimeZone};
use dupeguard::logging::{clear, export, follow, read_lines, LogFilter, RotatingFile};
use dupeguard::signal::ShutdownHandler;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const SAMPLE: &str = "\
2024-05-01 10:00:00 | INFO     | Monitoring started - Detection: Size=ON, Time=OFF, Hash=OFF
2024-05-01 10:00:05 | DEBUG    | Comparing with: invoice.pdf
2024-05-01 10:00:05 | INFO     | DUPLICATE CONFIRMED: invoice-1.pdf is duplicate of invoice.pdf (size matches (10 bytes))
2024-05-01 10:00:05 | ERROR    | FAILED - Permission denied: /w/invoice-1.pdf
2024-05-01 10:01:00 | WARNING  | Watched folder does not exist, skipping: /gone
2024-05-01 10:02:00 | INFO     | QUARANTINED: /w/report-1.pdf -> /q/2024-05-01/w/report-1.pdf (Size: 3 bytes, Reason: Duplicate of report.pdf)
";

#[test]
fn test_read_lines_filters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupeguard.log");
    fs::write(&path, SAMPLE).unwrap();

    assert_eq!(read_lines(&path, &LogFilter::All, 0).unwrap().len(), 6);

    let last_two = read_lines(&path, &LogFilter::All, 2).unwrap();
    assert!(last_two[0].contains("WARNING"));
    assert!(last_two[1].contains("QUARANTINED"));

    let problems = read_lines(&path, &LogFilter::Problems, 0).unwrap();
    assert_eq!(problems.len(), 2);

    let debug = read_lines(&path, &LogFilter::Debug, 0).unwrap();
    assert_eq!(debug, vec!["2024-05-01 10:00:05 | DEBUG    | Comparing with: invoice.pdf"]);

    let found = read_lines(&path, &LogFilter::Search("REPORT-1".to_string()), 0).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_read_lines_of_missing_log_is_empty() {
    let dir = tempdir().unwrap();
    assert!(read_lines(&dir.path().join("none.log"), &LogFilter::All, 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_follow_prints_appended_lines_until_shutdown() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupeguard.log");
    fs::write(&path, "2024-05-01 09:00:00 | INFO     | old line\n").unwrap();

    let shutdown = ShutdownHandler::new();
    let writer_path = path.clone();
    let writer_shutdown = shutdown.clone();
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let mut file = OpenOptions::new().append(true).open(&writer_path).unwrap();
        writeln!(file, "2024-05-01 09:00:01 | ERROR    | FAILED - Error moving /w/a-1.txt").unwrap();
        writeln!(file, "2024-05-01 09:00:02 | INFO     | NO DUPLICATE FOUND: b-1.txt").unwrap();
        drop(file);
        thread::sleep(Duration::from_millis(300));
        writer_shutdown.request_shutdown();
    });

    let mut out = Vec::new();
    follow(&path, &LogFilter::Problems, &shutdown, &mut out, Duration::from_millis(20)).unwrap();
    writer.join().unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(!printed.contains("old line"));
    assert!(printed.contains("FAILED - Error moving"));
    assert!(!printed.contains("NO DUPLICATE FOUND"));
}

#[test]
fn test_rotation_keeps_configured_backups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("dupeguard.log");
    let mut log = RotatingFile::open(&path, 64, 2).unwrap();
    // One write per line, the way the logger hands over formatted records.
    for i in 0..10 {
        let line = format!("2024-05-01 10:00:0{i} | INFO     | line number {i}\n");
        log.write_all(line.as_bytes()).unwrap();
    }
    log.flush().unwrap();

    assert!(path.exists());
    assert!(RotatingFile::backup_path(&path, 1).exists());
    assert!(RotatingFile::backup_path(&path, 2).exists());
    assert!(!RotatingFile::backup_path(&path, 3).exists());
    assert!(fs::read_to_string(&path).unwrap().contains("line number 9"));
}

#[test]
fn test_export_copies_log_with_timestamped_name() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("dupeguard.log");
    fs::write(&log, SAMPLE).unwrap();
    let out_dir = dir.path().join("exports");
    fs::create_dir(&out_dir).unwrap();
    let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap();

    let target = export(&log, Some(&out_dir), now).unwrap().unwrap();
    assert_eq!(target, out_dir.join("dupeguard_export_20240501_093005.log"));
    assert_eq!(fs::read_to_string(&target).unwrap(), SAMPLE);
    assert_eq!(fs::read_to_string(&log).unwrap(), SAMPLE);

    let named = dir.path().join("copy.log");
    assert_eq!(export(&log, Some(&named), now).unwrap(), Some(named.clone()));
    assert_eq!(fs::read_to_string(&named).unwrap(), SAMPLE);
}

#[test]
fn test_export_without_log_does_nothing() {
    let dir = tempdir().unwrap();
    let result = export(&dir.path().join("none.log"), Some(dir.path()), Local::now()).unwrap();
    assert_eq!(result, None);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_clear_keeps_backup_and_leaves_marker() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("dupeguard.log");
    fs::write(&log, SAMPLE).unwrap();
    let now = Local.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();

    let backup = clear(&log, now).unwrap().unwrap();
    assert_eq!(backup, dir.path().join("dupeguard.log.backup"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), SAMPLE);
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "2024-05-02 08:00:00 | INFO     | Log file cleared\n"
    );
    assert_eq!(read_lines(&log, &LogFilter::Problems, 0).unwrap().len(), 0);
}

#[test]
fn test_clear_without_log_does_nothing() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("dupeguard.log");
    assert_eq!(clear(&log, Local::now()).unwrap(), None);
    assert!(!log.exists());
}

