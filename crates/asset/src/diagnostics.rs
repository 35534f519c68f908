//! Non-fatal issues collected while parsing.
//!
//! Parsers never abort on a bad line or token: they drop the offending unit,
//! record it here and move on. Every entry is forwarded to the `log` facade as
//! it is recorded, so the host's logger sees it too.

use std::fmt;

const LOG_TARGET: &str = "asset";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based source line, when the issue comes from a text file.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, line: Option<usize>, message: impl Into<String>) {
        self.push(Severity::Warning, line, message.into());
    }

    pub fn error(&mut self, line: Option<usize>, message: impl Into<String>) {
        self.push(Severity::Error, line, message.into());
    }

    fn push(&mut self, severity: Severity, line: Option<usize>, message: String) {
        let entry = Diagnostic {
            severity,
            line,
            message,
        };
        match severity {
            Severity::Warning => log::warn!(target: LOG_TARGET, "{}", entry),
            Severity::Error => log::error!(target: LOG_TARGET, "{}", entry),
        }
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
