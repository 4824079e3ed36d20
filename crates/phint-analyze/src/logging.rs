//! Logging module for phint-analyze
//!
//! Writes a timestamped log of analyzer runs, trace parsing, decision
//! conflicts and editor activity. Logging is off until `init_logger` is
//! called; every helper is a no-op before that.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::Instruction;
use crate::trace::TraceStats;

/// Global logger instance
static LOGGER: Mutex<Option<PhintLogger>> = Mutex::new(None);

/// Logger writing to a single file
pub struct PhintLogger {
    file: File,
    path: PathBuf,
}

impl PhintLogger {
    /// Create a new logger writing to the specified path
    pub fn new(log_path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)?;

        Ok(Self {
            file,
            path: log_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a log message
    pub fn log(&mut self, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(self.file, "[{}] {}", timestamp, message);
        let _ = self.file.flush();
    }

    /// Log a section header
    pub fn section(&mut self, title: &str) {
        let separator = "=".repeat(60);
        self.log(&separator);
        self.log(title);
        self.log(&separator);
    }

    /// Log a subsection
    pub fn subsection(&mut self, title: &str) {
        let separator = "-".repeat(40);
        self.log(&separator);
        self.log(title);
        self.log(&separator);
    }
}

/// Initialize the global logger
///
/// Without an explicit path the log goes to `/tmp/phint-<timestamp>.log`.
pub fn init_logger(log_path: Option<&Path>) -> std::io::Result<PathBuf> {
    let path = log_path.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("/tmp/phint-{}.log", timestamp))
    });

    let logger = PhintLogger::new(&path)?;

    if let Ok(mut guard) = LOGGER.lock() {
        *guard = Some(logger);
    }

    Ok(path)
}

fn with_logger(f: impl FnOnce(&mut PhintLogger)) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            f(logger);
        }
    }
}

/// Log a message to the global logger
pub fn log(message: &str) {
    with_logger(|logger| logger.log(message));
}

/// Log a warning
pub fn warn(message: &str) {
    with_logger(|logger| logger.log(&format!("WARNING: {}", message)));
}

/// Log a section header
pub fn section(title: &str) {
    with_logger(|logger| logger.section(title));
}

/// Log a subsection
pub fn subsection(title: &str) {
    with_logger(|logger| logger.subsection(title));
}

/// Check if logging is enabled
pub fn is_enabled() -> bool {
    LOGGER.lock().map(|guard| guard.is_some()).unwrap_or(false)
}

/// Log the start of an analyzer pass
pub fn log_analyzer_start(name: &str) {
    subsection(&format!("ANALYZER: {}", name));
}

/// Log analyzer results
pub fn log_analyzer_done(name: &str, classes: usize, functions: usize) {
    log(&format!(
        "[{}] collection now holds {} classes, {} functions",
        name, classes, functions
    ));
}

/// Log trace parsing statistics
pub fn log_trace_summary(path: &Path, stats: &TraceStats) {
    section("TRACE PARSED");
    log(&format!("Trace file: {}", path.display()));
    log(&format!("Lines read: {}", stats.lines));
    log(&format!("Entry records: {}", stats.entries_seen));
    log(&format!("Entries retained: {}", stats.entries_retained));
    log(&format!("Returns retained: {}", stats.returns_retained));
    log(&format!("Test doubles detected: {}", stats.mocks_detected));
}

/// Log a conflicting set of observed types
pub fn log_inconsistent(function: &str, target: &str, names: &[String]) {
    warn(&format!(
        "{} {}: inconsistent types observed [{}], not annotating",
        function,
        target,
        names.join(", ")
    ));
}

/// Log an emitted instruction
pub fn log_instruction(instruction: &Instruction) {
    log(&format!("INSTRUCTION: {}", instruction));
}

/// Log an instruction the editor could not apply
pub fn log_editor_noop(instruction: &Instruction, reason: &str) {
    log(&format!("SKIPPED: {} - {}", instruction, reason));
}

/// Log an applied edit
pub fn log_edit_applied(instruction: &Instruction, path: &Path, line: usize) {
    log(&format!("APPLIED: {} at {}:{}", instruction, path.display(), line));
}

/// Log the decision summary
pub fn log_decision_summary(functions: usize, instructions: usize, inconsistent: usize) {
    section("DECISION COMPLETE");
    log(&format!("Functions examined: {}", functions));
    log(&format!("Instructions emitted: {}", instructions));
    log(&format!("Inconsistent outcomes: {}", inconsistent));
}
