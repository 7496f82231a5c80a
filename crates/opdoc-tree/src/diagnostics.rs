use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Source location of a diagnostic; `line` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub path: Option<PathBuf>,
    pub line: usize,
}

impl Cursor {
    pub fn new(path: Option<PathBuf>, line: usize) -> Self {
        Self { path, line }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: line {}", path.display(), self.line),
            None => write!(f, "<stdin>: line {}", self.line),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub cursor: Option<Cursor>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cursor {
            Some(cursor) => write!(f, "{}: {}: {}", self.severity, cursor, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}
