//! Plain-text rendering of diagnostics against the submitted source.
//!
//! Positions are zero-based everywhere in the data model; this module is
//! where they become the one-based lines and columns people expect to
//! read. Each located diagnostic gets its source line behind a
//! right-aligned number gutter and a caret under the resolved column:
//!
//! ```text
//! [parse] line 1, char 3: function "foo" not defined
//!  1 | {{foo}}{{bar}}
//!    |   ^
//! ```

use crate::diagnostic::Diagnostic;
use crate::source::SourceText;

/// Render every diagnostic with its source excerpt, in the given order.
pub fn render_report(source: &SourceText, diagnostics: &[Diagnostic]) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let gutter = count_digits(lines.len()).max(1);
    let mut out = String::new();

    for diagnostic in diagnostics {
        out.push_str(&diagnostic.to_string());
        out.push('\n');

        let located = diagnostic
            .line
            .and_then(|index| lines.get(index).map(|text| (index, *text)));
        let Some((index, text)) = located else {
            continue;
        };
        out.push_str(&format!(
            "{:>width$} | {}\n",
            index + 1,
            text,
            width = gutter
        ));
        if let Some(column) = diagnostic.column {
            out.push_str(&format!(
                "{:>width$} | {}^\n",
                "",
                " ".repeat(column),
                width = gutter
            ));
        }
    }

    out
}

/// Numbered listing of the whole source, gutter sized to the line count.
pub fn render_source(source: &SourceText) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let gutter = count_digits(lines.len()).max(1);
    let mut out = String::new();
    for (index, text) in lines.iter().enumerate() {
        out.push_str(&format!(
            "{:>width$} | {}\n",
            index + 1,
            text,
            width = gutter
        ));
    }
    out
}

/// Digits in the decimal rendering of `n`; zero has none.
fn count_digits(mut n: usize) -> usize {
    let mut digits = 0;
    while n > 0 {
        digits += 1;
        n /= 10;
    }
    digits
}
