//! In-memory fake engine for the [`TemplateEngine`] seam (testing only).
//!
//! Provides [`FakeEngine`], a miniature compiler/executor that satisfies
//! the seam contract without any external template library. It implements
//! just enough of the action grammar to reproduce the failure messages the
//! triage core decodes: block keywords needing `{{end}}`, empty expression
//! slots, unknown function references, and field lookups against JSON data
//! at execution time. Rendering is deliberately shallow (block bodies
//! render unconditionally); the tests only execute flat templates.

use serde_json::Value;

use crate::engine::{EngineError, TemplateEngine};
use crate::registry::SymbolRegistry;

/// Callables every template sees without registration.
const BUILTINS: &[&str] = &[
    "and", "call", "eq", "ge", "gt", "html", "index", "js", "le", "len", "lt", "ne", "not", "or",
    "print", "printf", "println", "slice", "urlquery",
];

// ---------------------------------------------------------------------------
// FakeEngine
// ---------------------------------------------------------------------------

/// Scans source between `{{`/`}}` delimiters and emits grammar-conformant
/// failure messages.
#[derive(Debug, Default)]
pub struct FakeEngine;

impl FakeEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Compiled form: the segment list, or no content at all for empty source.
#[derive(Debug)]
pub struct FakeArtifact {
    name: String,
    content: Option<Vec<Segment>>,
    registry: SymbolRegistry,
}

#[derive(Debug)]
enum Segment {
    /// Literal text copied to the output.
    Text(String),
    /// Field chain like `.Value`, with its one-based line and zero-based
    /// in-line byte offset.
    Field {
        path: Vec<String>,
        expr: String,
        line: usize,
        column: usize,
    },
    /// Registered function invoked with no arguments.
    Call {
        name: String,
        line: usize,
        column: usize,
    },
}

impl TemplateEngine for FakeEngine {
    type Artifact = FakeArtifact;

    fn compile(
        &self,
        name: &str,
        source: &str,
        registry: &SymbolRegistry,
    ) -> Result<FakeArtifact, EngineError> {
        if source.is_empty() {
            return Ok(FakeArtifact {
                name: name.to_string(),
                content: None,
                registry: registry.clone(),
            });
        }
        let scanner = Scanner {
            name,
            source,
            registry,
            segments: Vec::new(),
            blocks: Vec::new(),
        };
        Ok(FakeArtifact {
            name: name.to_string(),
            content: Some(scanner.scan()?),
            registry: registry.clone(),
        })
    }

    fn execute(
        &self,
        artifact: &FakeArtifact,
        data: &Value,
        output: &mut Vec<u8>,
    ) -> Result<(), EngineError> {
        let Some(segments) = &artifact.content else {
            return Err(EngineError::new(format!(
                "template: {}: \"{}\" is an incomplete or empty template",
                artifact.name, artifact.name
            )));
        };
        for segment in segments {
            match segment {
                Segment::Text(text) => output.extend_from_slice(text.as_bytes()),
                Segment::Field {
                    path,
                    expr,
                    line,
                    column,
                } => match eval_field(data, path) {
                    Ok(value) => output.extend_from_slice(render_value(&value).as_bytes()),
                    Err((field, label)) => {
                        return Err(artifact.exec_error(
                            *line,
                            *column,
                            expr,
                            &format!("can't evaluate field {} in type {}", field, label),
                        ));
                    }
                },
                Segment::Call { name, line, column } => {
                    match artifact.registry.call(name, &[]) {
                        Some(Ok(value)) => {
                            if !value.is_null() {
                                output.extend_from_slice(render_value(&value).as_bytes());
                            }
                        }
                        Some(Err(err)) => {
                            return Err(artifact.exec_error(
                                *line,
                                *column,
                                name,
                                &format!("error calling {}: {}", name, err),
                            ));
                        }
                        None => {
                            return Err(artifact.exec_error(
                                *line,
                                *column,
                                name,
                                &format!("\"{}\" is not a defined function", name),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl FakeArtifact {
    fn exec_error(&self, line: usize, column: usize, expr: &str, detail: &str) -> EngineError {
        EngineError::new(format!(
            "template: {}:{}:{}: executing \"{}\" at <{}>: {}",
            self.name, line, column, self.name, expr, detail
        ))
    }
}

// ---------------------------------------------------------------------------
// Action scanner
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    name: &'a str,
    source: &'a str,
    registry: &'a SymbolRegistry,
    segments: Vec<Segment>,
    blocks: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn scan(mut self) -> Result<Vec<Segment>, EngineError> {
        let src = self.source;
        let mut cursor = 0;
        while let Some(open_offset) = src[cursor..].find("{{") {
            let open = cursor + open_offset;
            if open > cursor {
                self.segments.push(Segment::Text(src[cursor..open].to_string()));
            }
            let Some(close_offset) = src[open + 2..].find("}}") else {
                return Err(self.error(line_of(src, open), "unclosed action"));
            };
            let close = open + 2 + close_offset;
            self.scan_action(open + 2, &src[open + 2..close])?;
            cursor = close + 2;
        }
        if cursor < src.len() {
            self.segments.push(Segment::Text(src[cursor..].to_string()));
        }
        if !self.blocks.is_empty() {
            return Err(self.error(line_count(src), "unexpected EOF"));
        }
        Ok(self.segments)
    }

    fn scan_action(&mut self, content_start: usize, content: &str) -> Result<(), EngineError> {
        let src = self.source;
        let line = line_of(src, content_start);
        let (effective_start, effective_end) = effective_range(content);
        let effective = &content[effective_start..effective_end];

        if effective.trim().is_empty() {
            return Err(self.error(line, "missing value for command"));
        }
        for command in effective.split('|') {
            if command.trim().is_empty() {
                return Err(self.error(line, "missing value for command"));
            }
        }

        let tokens = tokenize(effective);
        let (first_offset, first) = tokens[0];
        match first {
            "if" | "range" | "with" | "block" | "define" => {
                if tokens.len() == 1 {
                    return Err(self.error(line, &format!("missing value for {}", first)));
                }
                for &(_, token) in &tokens[1..] {
                    self.check_token(line, token)?;
                }
                self.blocks.push(first.to_string());
            }
            "end" => {
                if self.blocks.pop().is_none() {
                    return Err(self.error(line, "unexpected {{end}}"));
                }
            }
            "else" => {}
            _ => {
                for &(_, token) in &tokens {
                    self.check_token(line, token)?;
                }
                let column = column_of(src, content_start + effective_start + first_offset);
                if let Some(path) = field_path(first) {
                    self.segments.push(Segment::Field {
                        path,
                        expr: first.to_string(),
                        line,
                        column,
                    });
                } else if is_word(first) {
                    self.segments.push(Segment::Call {
                        name: first.to_string(),
                        line,
                        column,
                    });
                } else if let Some(text) = literal_text(first) {
                    self.segments.push(Segment::Text(text));
                }
            }
        }
        Ok(())
    }

    fn check_token(&self, line: usize, token: &str) -> Result<(), EngineError> {
        if token.contains('[') {
            return Err(self.error(line, "unexpected bad character U+005B '[' in command"));
        }
        if !is_word(token) || matches!(token, "true" | "false" | "nil") {
            return Ok(());
        }
        if BUILTINS.contains(&token) || self.registry.contains(token) {
            return Ok(());
        }
        Err(self.error(line, &format!("function \"{}\" not defined", token)))
    }

    fn error(&self, line: usize, description: &str) -> EngineError {
        EngineError::new(format!("template: {}:{}: {}", self.name, line, description))
    }
}

// ---------------------------------------------------------------------------
// Scanner helpers
// ---------------------------------------------------------------------------

/// Byte range of action content once leading/trailing trim markers are
/// dropped. A marker is a dash adjacent to its delimiter with whitespace
/// (or nothing) on the inner side.
fn effective_range(content: &str) -> (usize, usize) {
    let bytes = content.as_bytes();
    let mut start = 0;
    let mut end = bytes.len();
    if !bytes.is_empty() && bytes[0] == b'-' && bytes.get(1).map_or(true, |b| b.is_ascii_whitespace())
    {
        start = 1;
    }
    if end > start
        && bytes[end - 1] == b'-'
        && (end - 1 == start || bytes[end - 2].is_ascii_whitespace())
    {
        end -= 1;
    }
    (start, end)
}

/// Whitespace- and pipe-separated tokens with their byte offsets.
fn tokenize(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in text.char_indices() {
        if ch.is_whitespace() || ch == '|' {
            if let Some(token_start) = start.take() {
                tokens.push((token_start, &text[token_start..index]));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(token_start) = start {
        tokens.push((token_start, &text[token_start..]));
    }
    tokens
}

/// `.Foo.Bar` into path segments; a lone `.` is the whole-data reference.
fn field_path(token: &str) -> Option<Vec<String>> {
    let rest = token.strip_prefix('.')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('.').map(str::to_string).collect())
}

fn is_word(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(head) if head.is_alphabetic() || head == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Literal tokens render as themselves: quoted strings unwrap, numbers
/// print as written.
fn literal_text(token: &str) -> Option<String> {
    if token.starts_with('"') {
        return serde_json::from_str::<String>(token).ok();
    }
    let numeric = token.strip_prefix('-').unwrap_or(token);
    if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Some(token.to_string());
    }
    None
}

/// One-based line of the byte at `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Zero-based byte offset within the line containing `offset`.
fn column_of(source: &str, offset: usize) -> usize {
    match source[..offset].rfind('\n') {
        Some(newline) => offset - newline - 1,
        None => offset,
    }
}

/// One-based number of the line EOF sits on.
fn line_count(source: &str) -> usize {
    source.matches('\n').count() + 1
}

fn eval_field(data: &Value, path: &[String]) -> Result<Value, (String, &'static str)> {
    let mut current = data;
    for field in path {
        match current.get(field.as_str()) {
            Some(next) => current = next,
            None => return Err((field.clone(), type_label(current))),
        }
    }
    Ok(current.clone())
}

/// Go-flavored type names for the failure text.
fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "<nil>",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "[]interface {}",
        Value::Object(_) => "map[string]interface {}",
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "<no value>".to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(source: &str) -> Result<FakeArtifact, EngineError> {
        FakeEngine::new().compile("base", source, &SymbolRegistry::new())
    }

    fn execute(artifact: &FakeArtifact, data: &Value) -> Result<String, (String, EngineError)> {
        let mut output = Vec::new();
        match FakeEngine::new().execute(artifact, data, &mut output) {
            Ok(()) => Ok(String::from_utf8(output).unwrap()),
            Err(err) => Err((String::from_utf8(output).unwrap(), err)),
        }
    }

    #[test]
    fn test_plain_text_compiles_and_renders() {
        let artifact = compile("hello world").unwrap();
        assert_eq!(execute(&artifact, &Value::Null).unwrap(), "hello world");
    }

    #[test]
    fn test_unknown_function_message() {
        let err = compile("{{foo}}{{bar}}").unwrap_err();
        assert_eq!(
            err.message(),
            "template: base:1: function \"foo\" not defined"
        );
    }

    #[test]
    fn test_registered_function_compiles() {
        let registry = SymbolRegistry::with_names(["foo"]).unwrap();
        assert!(FakeEngine::new().compile("base", "{{foo}}", &registry).is_ok());
    }

    #[test]
    fn test_unclosed_block_reports_eof_at_last_line() {
        let err = compile("{{if .Value}}").unwrap_err();
        assert_eq!(err.message(), "template: base:1: unexpected EOF");

        let err = compile("{{if .Value}}\ntext\n").unwrap_err();
        assert_eq!(err.message(), "template: base:3: unexpected EOF");
    }

    #[test]
    fn test_balanced_block_compiles() {
        let artifact = compile("{{if .Value}}yes{{end}}").unwrap();
        // Shallow rendering: block bodies are not gated.
        assert_eq!(execute(&artifact, &json!({"Value": true})).unwrap(), "yes");
    }

    #[test]
    fn test_keyword_without_operand() {
        let err = compile("{{if}}{{end}}").unwrap_err();
        assert_eq!(err.message(), "template: base:1: missing value for if");
    }

    #[test]
    fn test_empty_slots_report_missing_value() {
        for source in ["{{}}", "{{- }}", "{{  -}}", "{{ }}"] {
            let err = compile(source).unwrap_err();
            assert_eq!(
                err.message(),
                "template: base:1: missing value for command",
                "source {:?}",
                source
            );
        }
    }

    #[test]
    fn test_empty_pipeline_stage_reports_missing_value() {
        let err = compile("{{|}}").unwrap_err();
        assert_eq!(
            err.message(),
            "template: base:1: missing value for command"
        );
    }

    #[test]
    fn test_empty_slot_line_counts_from_one() {
        let err = compile("\n\n{{ }} hello world {{ }}").unwrap_err();
        assert_eq!(
            err.message(),
            "template: base:3: missing value for command"
        );
    }

    #[test]
    fn test_unexpected_end() {
        let err = compile("{{end}}").unwrap_err();
        assert_eq!(err.message(), "template: base:1: unexpected {{end}}");
    }

    #[test]
    fn test_unclosed_action() {
        let err = compile("text {{.Value").unwrap_err();
        assert_eq!(err.message(), "template: base:1: unclosed action");
    }

    #[test]
    fn test_index_syntax_rejected() {
        let err = compile("<{{.Foo[2]}}>").unwrap_err();
        assert_eq!(
            err.message(),
            "template: base:1: unexpected bad character U+005B '[' in command"
        );
    }

    #[test]
    fn test_field_renders_from_object() {
        let artifact = compile("<{{.Value}}>").unwrap();
        let output = execute(&artifact, &json!({"Value": "hi"})).unwrap();
        assert_eq!(output, "<hi>");
    }

    #[test]
    fn test_missing_field_fails_with_partial_output() {
        let artifact = compile("<{{.Value}}>").unwrap();
        let (partial, err) = execute(&artifact, &json!({})).unwrap_err();
        assert_eq!(partial, "<");
        assert_eq!(
            err.message(),
            "template: base:1:3: executing \"base\" at <.Value>: \
             can't evaluate field Value in type map[string]interface {}"
        );
    }

    #[test]
    fn test_nested_field_walk() {
        let artifact = compile("{{.Foo.Bar}}").unwrap();
        let output = execute(&artifact, &json!({"Foo": {"Bar": 7}})).unwrap();
        assert_eq!(output, "7");

        let (_, err) = execute(&artifact, &json!({"Foo": {}})).unwrap_err();
        assert!(err.message().contains("can't evaluate field Bar"));
    }

    #[test]
    fn test_null_field_renders_no_value() {
        let artifact = compile("{{.Value}}").unwrap();
        let output = execute(&artifact, &json!({"Value": null})).unwrap();
        assert_eq!(output, "<no value>");
    }

    #[test]
    fn test_whole_data_reference() {
        let artifact = compile("{{.}}").unwrap();
        assert_eq!(execute(&artifact, &json!("all")).unwrap(), "all");
    }

    #[test]
    fn test_empty_source_compiles_to_contentless_artifact() {
        let artifact = compile("").unwrap();
        let (partial, err) = execute(&artifact, &Value::Null).unwrap_err();
        assert_eq!(partial, "");
        assert_eq!(
            err.message(),
            "template: base: \"base\" is an incomplete or empty template"
        );
    }

    #[test]
    fn test_masked_source_compiles_clean() {
        let artifact = compile("    ").unwrap();
        assert_eq!(execute(&artifact, &Value::Null).unwrap(), "    ");
    }

    #[test]
    fn test_stubbed_call_renders_nothing() {
        let mut registry = SymbolRegistry::new();
        registry.stub("nl");
        let artifact = FakeEngine::new().compile("base", "a{{nl}}b", &registry).unwrap();
        let mut output = Vec::new();
        FakeEngine::new().execute(&artifact, &Value::Null, &mut output).unwrap();
        assert_eq!(output, b"ab");
    }

    #[test]
    fn test_builtins_need_no_registration() {
        assert!(compile("{{if not .Done}}x{{end}}").is_ok());
    }

    #[test]
    fn test_exec_column_accounts_for_action_padding() {
        let artifact = compile("<{{ .Value }}>").unwrap();
        let (_, err) = execute(&artifact, &json!({})).unwrap_err();
        assert!(err.message().starts_with("template: base:1:4: "));
    }

    #[test]
    fn test_literal_tokens_render() {
        let artifact = compile("{{\"quoted\"}}-{{42}}").unwrap();
        assert_eq!(execute(&artifact, &Value::Null).unwrap(), "quoted-42");
    }
}
