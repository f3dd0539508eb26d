//! The host-visible log panel: an append-only sequence of console
//! entries fed by the sandbox bridge, the error interceptor and the
//! host page's own error handler.
//!
//! The panel outlives sandbox rebuilds; it is only emptied by an
//! explicit user-driven `clear`.

use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Severity of one reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Parse the label the bridge sends over the op boundary.
    /// Unknown labels downgrade to Info rather than dropping the line.
    pub fn from_label(label: &str) -> Severity {
        match label {
            "warning" | "warn" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Stderr prefix used by the CLI.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "[LOG]",
            Severity::Warning => "[WARN]",
            Severity::Error => "[ERROR]",
        }
    }
}

/// One reported line of sandbox or host activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleEntry {
    pub severity: Severity,
    pub text: String,
}

impl ConsoleEntry {
    pub fn info(text: impl Into<String>) -> Self {
        ConsoleEntry { severity: Severity::Info, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ConsoleEntry { severity: Severity::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ConsoleEntry { severity: Severity::Error, text: text.into() }
    }
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.tag(), self.text)
    }
}

/// Shared handle to the entry sequence.
///
/// Cloned into the sandbox op state on every rebuild so bridge ops and
/// the host report into the same panel. Single-threaded by design, like
/// everything else in the engine.
#[derive(Debug, Clone, Default)]
pub struct LogPanel {
    entries: Rc<RefCell<Vec<ConsoleEntry>>>,
}

impl LogPanel {
    pub fn new() -> Self {
        LogPanel::default()
    }

    pub fn append(&self, entry: ConsoleEntry) {
        self.entries.borrow_mut().push(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Explicit user-driven clear; never called by the engine itself.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Report an uncaught error from the host page itself.
    ///
    /// Host errors are not sandbox-scoped, so the entry carries the full
    /// source location. Never rethrows: there is no outer supervisor.
    pub fn report_host_error(&self, message: &str, source: &str, line: u32, column: u32) {
        self.append(ConsoleEntry::error(format!(
            "Error: {} at {}:{}:{}",
            message, source, line, column
        )));
    }
}
