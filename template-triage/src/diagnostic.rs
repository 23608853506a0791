//! Diagnostic data model.
//!
//! A [`Diagnostic`] is the structured form of one compiler or executor
//! failure: a zero-based source position (when one could be recovered), the
//! failure description, and a [`Severity`] naming the phase it came from.
//! Diagnostics are immutable once the decode/locate/repair pipeline has
//! produced them; the repair loop accumulates them in attempt order and
//! never deduplicates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase classification for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Compile-time failure. The only class the repair loop acts on.
    Parse,
    /// Evaluation-time failure. Reported, never auto-repaired.
    Exec,
    /// The message did not match the compiler's error grammar. Carries the
    /// raw text verbatim and never carries a position.
    Unclassified,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Exec => write!(f, "exec"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// One decoded compiler or executor failure.
///
/// `line` and `column` are zero-based byte-oriented positions into the
/// source the failure was reported against. `None` means the position was
/// not recoverable or was ambiguous; a guessed position is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Zero-based line index into the submitted source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Zero-based byte offset within that line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Human-readable failure description from the engine.
    pub description: String,
    /// Phase the failure came from.
    pub severity: Severity,
}

impl Diagnostic {
    /// Diagnostic with no position attached yet.
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Self {
            line: None,
            column: None,
            description: description.into(),
            severity,
        }
    }

    /// Fallback for messages outside the error grammar: the raw text is
    /// preserved verbatim and no position is ever attached.
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(Severity::Unclassified, message)
    }
}

impl fmt::Display for Diagnostic {
    /// One-based positions, matching what an editor shows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "[{}] line {}, char {}: {}",
                self.severity,
                line + 1,
                column + 1,
                self.description
            ),
            (Some(line), None) => write!(
                f,
                "[{}] line {}: {}",
                self.severity,
                line + 1,
                self.description
            ),
            _ => write!(f, "[{}] {}", self.severity, self.description),
        }
    }
}
