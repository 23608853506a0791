//! Repair strategies for recoverable compile failures.
//!
//! Two failure classes are auto-repairable. An undefined function
//! reference is cleared by stubbing the exact reported name with a no-op
//! callable, which surfaces the next independent error on the retry. A
//! syntactically empty expression slot is cleared by masking it with an
//! equal-width run of spaces, which keeps every other byte offset stable.
//! Strategies are consulted in that order and at most one plan comes back
//! per diagnostic; a diagnostic neither strategy claims is final.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, Severity};
use crate::registry::SymbolRegistry;
use crate::source::SourceText;

static UNDEFINED_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"function "(.+)" not defined"#).unwrap());

static MISSING_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"missing value for command").unwrap());

/// Minimal empty expression slot: delimiters around nothing but optional
/// trim markers and whitespace.
static EMPTY_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{((-?\s*?)|(\s*?-?))\}\}").unwrap());

/// One applied repair, as recorded in the attempt trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// Registered a no-op placeholder for an undefined function reference.
    StubSymbol { name: String },
    /// Blanked an empty expression slot with same-width spaces.
    MaskSlot { offset: usize, len: usize },
}

impl fmt::Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StubSymbol { name } => write!(f, "stub symbol \"{}\"", name),
            Self::MaskSlot { offset, len } => {
                write!(f, "mask {}-byte slot at offset {}", len, offset)
            }
        }
    }
}

/// Repair selected for one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPlan {
    pub kind: RepairKind,
    /// Column the strategy resolved for the triggering diagnostic, when it
    /// knows better than the quoted-token disambiguator.
    pub column: Option<usize>,
}

impl RepairPlan {
    /// Produce the inputs for the next compile attempt. The given registry
    /// is cloned, never mutated.
    pub fn apply(
        &self,
        source: &SourceText,
        registry: &SymbolRegistry,
    ) -> (SourceText, SymbolRegistry) {
        match &self.kind {
            RepairKind::StubSymbol { name } => {
                let mut stubbed = registry.clone();
                stubbed.stub(name);
                (source.clone(), stubbed)
            }
            RepairKind::MaskSlot { offset, len } => {
                (source.masked(*offset..*offset + *len), registry.clone())
            }
        }
    }
}

/// Select a repair for `diagnostic` against the current `source`, if one of
/// the strategies applies. Only parse-severity diagnostics are repairable.
pub fn plan(diagnostic: &Diagnostic, source: &SourceText) -> Option<RepairPlan> {
    if diagnostic.severity != Severity::Parse {
        return None;
    }
    plan_stub(diagnostic).or_else(|| plan_mask(diagnostic, source))
}

fn plan_stub(diagnostic: &Diagnostic) -> Option<RepairPlan> {
    let caps = UNDEFINED_FUNCTION.captures(&diagnostic.description)?;
    Some(RepairPlan {
        kind: RepairKind::StubSymbol {
            name: caps[1].to_string(),
        },
        column: None,
    })
}

fn plan_mask(diagnostic: &Diagnostic, source: &SourceText) -> Option<RepairPlan> {
    if !MISSING_VALUE.is_match(&diagnostic.description) {
        return None;
    }
    // The description can match while the source has no maskable slot
    // (for example a pipeline with an empty stage); that is not repairable.
    let slot = EMPTY_SLOT.find(source.as_str())?;
    // The compiler names the line but no column for this class; the first
    // empty slot on the flagged line of the current source supplies it.
    let column = diagnostic
        .line
        .and_then(|index| source.line(index))
        .and_then(|line| EMPTY_SLOT.find(line))
        .map(|m| m.start());
    Some(RepairPlan {
        kind: RepairKind::MaskSlot {
            offset: slot.start(),
            len: slot.len(),
        },
        column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_diagnostic(line: usize, description: &str) -> Diagnostic {
        Diagnostic {
            line: Some(line),
            column: None,
            description: description.to_string(),
            severity: Severity::Parse,
        }
    }

    #[test]
    fn test_plans_stub_for_undefined_function() {
        let source = SourceText::new("{{foo}}{{bar}}");
        let diagnostic = parse_diagnostic(0, "function \"foo\" not defined");
        let plan = plan(&diagnostic, &source).unwrap();
        assert_eq!(
            plan.kind,
            RepairKind::StubSymbol {
                name: "foo".to_string()
            }
        );
        assert_eq!(plan.column, None);
    }

    #[test]
    fn test_stub_apply_leaves_source_and_caller_registry_alone() {
        let source = SourceText::new("{{foo}}");
        let registry = SymbolRegistry::new();
        let diagnostic = parse_diagnostic(0, "function \"foo\" not defined");
        let plan = plan(&diagnostic, &source).unwrap();

        let (next_source, next_registry) = plan.apply(&source, &registry);
        assert_eq!(next_source, source);
        assert!(next_registry.contains("foo"));
        assert!(!registry.contains("foo"));
    }

    #[test]
    fn test_stub_uses_exact_reported_token() {
        let source = SourceText::new("{{x}}");
        let diagnostic = parse_diagnostic(0, "function \"we ird\" not defined");
        let plan = plan(&diagnostic, &source).unwrap();
        let (_, registry) = plan.apply(&source, &SymbolRegistry::new());
        assert!(registry.contains("we ird"));
    }

    #[test]
    fn test_plans_mask_with_column_refinement() {
        let source = SourceText::new("{{}}");
        let diagnostic = parse_diagnostic(0, "missing value for command");
        let plan = plan(&diagnostic, &source).unwrap();
        assert_eq!(
            plan.kind,
            RepairKind::MaskSlot { offset: 0, len: 4 }
        );
        assert_eq!(plan.column, Some(0));
    }

    #[test]
    fn test_mask_matches_trim_marker_slots() {
        for (text, len) in [("{{- }}", 6), ("{{  -}}", 7), ("{{ }}", 5)] {
            let source = SourceText::new(text);
            let diagnostic = parse_diagnostic(0, "missing value for command");
            let plan = plan(&diagnostic, &source).unwrap();
            assert_eq!(
                plan.kind,
                RepairKind::MaskSlot { offset: 0, len },
                "slot {:?}",
                text
            );
        }
    }

    #[test]
    fn test_mask_apply_preserves_byte_length() {
        let source = SourceText::new("a{{- }}b");
        let diagnostic = parse_diagnostic(0, "missing value for command");
        let plan = plan(&diagnostic, &source).unwrap();
        let (masked, _) = plan.apply(&source, &SymbolRegistry::new());
        assert_eq!(masked.as_str(), "a      b");
        assert_eq!(masked.len(), source.len());
    }

    #[test]
    fn test_mask_column_from_flagged_line_of_current_source() {
        // First slot already masked: the whole-text match and the flagged
        // line both point at the second slot now.
        let source = SourceText::new("\n\n      hello world {{ }}");
        let diagnostic = parse_diagnostic(2, "missing value for command");
        let plan = plan(&diagnostic, &source).unwrap();
        assert_eq!(
            plan.kind,
            RepairKind::MaskSlot { offset: 20, len: 5 }
        );
        assert_eq!(plan.column, Some(18));
    }

    #[test]
    fn test_missing_value_without_slot_is_not_repairable() {
        let source = SourceText::new("{{|}}");
        let diagnostic = parse_diagnostic(0, "missing value for command");
        assert_eq!(plan(&diagnostic, &source), None);
    }

    #[test]
    fn test_missing_value_for_if_is_not_repairable() {
        let source = SourceText::new("{{if}}{{end}}");
        let diagnostic = parse_diagnostic(0, "missing value for if");
        assert_eq!(plan(&diagnostic, &source), None);
    }

    #[test]
    fn test_exec_diagnostics_are_never_repaired() {
        let source = SourceText::new("{{foo}}");
        let diagnostic = Diagnostic {
            line: Some(0),
            column: Some(2),
            description: "function \"foo\" not defined".to_string(),
            severity: Severity::Exec,
        };
        assert_eq!(plan(&diagnostic, &source), None);
    }

    #[test]
    fn test_unclassified_diagnostics_are_never_repaired() {
        let source = SourceText::new("{{}}");
        let diagnostic = Diagnostic::unclassified("missing value for command");
        assert_eq!(plan(&diagnostic, &source), None);
    }

    #[test]
    fn test_stub_considered_before_mask() {
        // A description carrying both signals picks the stub path.
        let source = SourceText::new("{{}}");
        let diagnostic = parse_diagnostic(
            0,
            "function \"x\" not defined: missing value for command",
        );
        let plan = plan(&diagnostic, &source).unwrap();
        assert!(matches!(plan.kind, RepairKind::StubSymbol { .. }));
    }

    #[test]
    fn test_mask_column_skipped_for_out_of_range_line() {
        let source = SourceText::new("{{}}");
        let diagnostic = parse_diagnostic(7, "missing value for command");
        let plan = plan(&diagnostic, &source).unwrap();
        assert_eq!(plan.column, None);
    }

    #[test]
    fn test_repair_kind_display() {
        let stub = RepairKind::StubSymbol {
            name: "foo".to_string(),
        };
        assert_eq!(stub.to_string(), "stub symbol \"foo\"");
        let mask = RepairKind::MaskSlot { offset: 4, len: 5 };
        assert_eq!(mask.to_string(), "mask 5-byte slot at offset 4");
    }
}
