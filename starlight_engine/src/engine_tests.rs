//! Unit tests for engine.rs (global logger)

use crate::engine::Engine;
use crate::error::Error;
use crate::log::{Logger, LogEntry, LogSeverity};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Logger that captures every entry for verification
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

/// Entries logged by this test module only (other tests may log concurrently)
fn captured_from(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries.lock().unwrap().iter().filter(|e| e.source == source).cloned().collect()
}

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let entries = install_capture_logger();

    Engine::log(LogSeverity::Info, "starlight::test", "hello".to_string());
    crate::engine_warn!("starlight::test", "queue {} is full", 3);

    let captured = captured_from(&entries, "starlight::test");
    Engine::reset_logger();

    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].message, "hello");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[1].message, "queue 3 is full");
    assert!(captured[1].file.is_none());
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let entries = install_capture_logger();

    let err = crate::engine_err!("starlight::test_vulkan", "vkCreateBuffer returned {}", -2);

    let captured = captured_from(&entries, "starlight::test_vulkan");
    Engine::reset_logger();

    assert_eq!(err, Error::BackendError("vkCreateBuffer returned -2".to_string()));
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert!(captured[0].file.is_some());
    assert!(captured[0].line.is_some());
}

#[test]
#[serial]
fn test_engine_bail_returns_error() {
    let entries = install_capture_logger();

    fn failing() -> crate::error::Result<()> {
        crate::engine_bail!("starlight::test", "bail out");
    }
    let result = failing();

    let count = captured_from(&entries, "starlight::test").len();
    Engine::reset_logger();

    assert_eq!(result, Err(Error::BackendError("bail out".to_string())));
    assert_eq!(count, 1);
}

#[test]
#[serial]
fn test_logging_from_other_threads() {
    let entries = install_capture_logger();

    let handles: Vec<_> = (0..4)
        .map(|i| std::thread::spawn(move || {
            crate::engine_debug!("starlight::test", "thread {}", i);
        }))
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let count = captured_from(&entries, "starlight::test").len();
    Engine::reset_logger();
    assert_eq!(count, 4);
}
