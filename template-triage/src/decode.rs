//! Diagnostic decoder.
//!
//! The compiler behind the engine seam reports every failure as a flat
//! string following a fixed grammar:
//!
//! ```text
//! template: <name>:<line>: <description>          parse-time shape
//! template: <name>:<line>:<char>: <description>   exec-time shape
//! ```
//!
//! `<line>` is one-based, `<char>` is a zero-based byte offset within the
//! line. [`decode`] recovers the structured form, converting lines to
//! zero-based on the way in. Messages matching neither shape degrade to
//! [`Severity::Unclassified`] with the raw text preserved verbatim;
//! decoding never fails and never panics.

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::{Diagnostic, Severity};

/// Both message shapes in one pattern. When the optional inner group is
/// present the captures are (name, line, char, description), otherwise
/// (name, line, description).
static MESSAGE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"template: (.*?):((\d+):)?(\d+): (.*)").unwrap());

/// Decode one engine failure message into a structured diagnostic.
///
/// `severity` is attached only when the message matches the grammar;
/// unmatched messages come back as [`Diagnostic::unclassified`]. Numeric
/// fields that fail to convert degrade to `None` rather than poisoning the
/// whole decode.
pub fn decode(raw: &str, severity: Severity) -> Diagnostic {
    let Some(caps) = MESSAGE_SHAPE.captures(raw) else {
        return Diagnostic::unclassified(raw);
    };

    let (line, column) = match caps.get(3) {
        // Exec shape: both a line and a character offset.
        Some(line_field) => (
            to_zero_based(line_field.as_str()),
            caps[4].parse::<usize>().ok(),
        ),
        // Parse shape: line only.
        None => (to_zero_based(&caps[4]), None),
    };

    Diagnostic {
        line,
        column,
        description: caps[5].to_string(),
        severity,
    }
}

/// One-based line text to zero-based index. Unparseable or zero values
/// yield `None` instead of a bogus position.
fn to_zero_based(field: &str) -> Option<usize> {
    field.parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}
