//! Submitted template source and the byte-precise edits repairs make to it.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable template source text.
///
/// Repairs never mutate in place: [`SourceText::masked`] returns a new
/// value with the selected span blanked out at equal byte width, so
/// positions computed against the surrounding text stay valid across
/// repair attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceText {
    text: String,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Lines split on `\n`, with Windows `\r\n` endings normalized away.
    /// Empty source still has one (empty) line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// The zero-based `index`th line, if the source reaches that far.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines().nth(index)
    }

    /// New source with `range` replaced by an equal-width run of spaces.
    /// Total byte length is preserved. `range` must lie on character
    /// boundaries within the source.
    pub fn masked(&self, range: Range<usize>) -> Self {
        let mut text = String::with_capacity(self.text.len());
        text.push_str(&self.text[..range.start]);
        text.extend(std::iter::repeat(' ').take(range.len()));
        text.push_str(&self.text[range.end..]);
        Self { text }
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// The submitted text was not a usable quoted string literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to unquote string literal (did you copy the wrapping quotes?): {reason}")]
pub struct UnquoteError {
    reason: String,
}

impl UnquoteError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Decode a pasted string literal into plain source text.
///
/// Users pasting template source copied out of code tend to bring the
/// literal syntax along. Double-quoted input is decoded through the JSON
/// string grammar, which covers the escapes that actually occur (`\n`,
/// `\t`, `\"`, `\u....`); backtick-delimited raw literals are unwrapped
/// verbatim. Anything else is rejected with a hint about the wrapping
/// quotes. Surrounding whitespace is ignored.
pub fn unquote_literal(raw: &str) -> Result<String, UnquoteError> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('`') {
        return inner
            .strip_suffix('`')
            .map(str::to_string)
            .ok_or_else(|| UnquoteError::new("unterminated raw literal"));
    }
    if trimmed.starts_with('"') {
        return serde_json::from_str::<String>(trimmed)
            .map_err(|err| UnquoteError::new(err.to_string()));
    }
    Err(UnquoteError::new("input is not a quoted literal"))
}
