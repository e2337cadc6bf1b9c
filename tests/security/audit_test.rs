/*!
 * Violation Audit Trail Integration Tests
 */

use ai_os_sandbox::monitoring::{AuditSeverity, ViolationLogger};
use std::sync::Arc;
use std::thread;

fn is_well_formed(line: &str) -> bool {
    // YYYY-MM-DD HH:MM:SS,mmm - LEVEL - message
    let Some((stamp, rest)) = line.split_once(" - ") else {
        return false;
    };
    let Some((level, message)) = rest.split_once(" - ") else {
        return false;
    };
    stamp.len() == 23
        && stamp.as_bytes()[10] == b' '
        && stamp.as_bytes()[19] == b','
        && ["INFO", "WARNING", "CRITICAL"].contains(&level)
        && !message.is_empty()
}

#[test]
fn test_records_append_across_loggers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");

    ViolationLogger::new(&path).record(AuditSeverity::Warning, "first");
    ViolationLogger::new(&path).record(AuditSeverity::Critical, "second");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| is_well_formed(line)));
    assert!(lines[0].ends_with(" - WARNING - first"));
    assert!(lines[1].ends_with(" - CRITICAL - second"));
}

#[test]
fn test_concurrent_records_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let logger = Arc::new(ViolationLogger::new(&path));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..50 {
                    logger.record(AuditSeverity::Warning, format!("thread {t} record {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 200);
    assert!(lines.iter().all(|line| is_well_formed(line)));
    assert_eq!(logger.records_written(), 200);
}

#[test]
fn test_unwritable_sink_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let logger = ViolationLogger::new(dir.path().join("missing").join("audit.log"));

    logger.record(AuditSeverity::Warning, "dropped");
    logger.record(AuditSeverity::Warning, "dropped again");

    let stats = logger.stats();
    assert_eq!(stats.records_written, 0);
    assert_eq!(stats.failed_writes, 2);
}
