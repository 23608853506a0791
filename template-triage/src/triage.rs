//! Bounded diagnose-and-repair driver plus execution diagnostics.
//!
//! ```text
//!   source ──▶ compile ──ok──▶ artifact
//!                │ fail
//!                ▼
//!             decode ──▶ locate column ──▶ plan repair ──▶ apply, retry
//!                │                            │
//!                │ no plan or budget spent    │ depth + 1
//!                ▼                            ▼
//!         diagnostics in attempt order, final source/registry
//! ```
//!
//! Every compile failure becomes one [`Diagnostic`]; repairs mutate private
//! copies of the source and registry and the loop retries until the
//! template compiles, no strategy applies, or the depth budget runs out.
//! Execution failures go through the same decoder but never loop:
//! evaluation is diagnosed, not repaired.

use std::borrow::Cow;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::decode::decode;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::{EngineError, TemplateEngine};
use crate::locate::locate_token;
use crate::registry::{RegistryError, SymbolRegistry};
use crate::repair::{self, RepairKind};
use crate::source::SourceText;

/// Knobs for one [`Triage`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Repairs allowed before a still-failing compile is given up on. The
    /// final failure is still decoded and reported, just not repaired.
    pub max_repair_depth: u32,
    /// Name the engine knows the template under; appears verbatim in its
    /// error messages.
    pub template_name: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            max_repair_depth: 10,
            template_name: "base".to_string(),
        }
    }
}

/// One compile attempt inside [`Triage::diagnose`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Zero-based attempt depth.
    pub depth: u32,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// Whether this attempt's compile succeeded.
    pub compiled: bool,
    /// Repair applied after this attempt failed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<RepairKind>,
}

/// Outcome of [`Triage::diagnose`].
#[derive(Debug)]
pub struct DiagnoseResult<A> {
    /// Compiled artifact, present when some attempt compiled cleanly.
    pub artifact: Option<A>,
    /// Every failure observed, in attempt order. Never deduplicated.
    pub diagnostics: Vec<Diagnostic>,
    /// Audit trail of attempts, including the successful one.
    pub attempts: Vec<AttemptRecord>,
    /// Wall-clock time for the whole loop.
    pub duration_ms: u64,
    /// Source as of the final attempt; repairs may have masked spans.
    pub source: SourceText,
    /// Registry as of the final attempt; repairs may have added stubs.
    pub registry: SymbolRegistry,
}

impl<A> DiagnoseResult<A> {
    /// Compiled on the first attempt with nothing to report.
    pub fn is_clean(&self) -> bool {
        self.artifact.is_some() && self.diagnostics.is_empty()
    }

    /// Number of repairs that were applied.
    pub fn repair_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.repair.is_some())
            .count()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let outcome = if self.artifact.is_some() {
            "compiled"
        } else {
            "failed"
        };
        format!(
            "{}: {} attempt(s), {} repair(s), {} diagnostic(s) in {}ms",
            outcome,
            self.attempts.len(),
            self.repair_count(),
            self.diagnostics.len(),
            self.duration_ms
        )
    }
}

/// Outcome of [`Triage::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Rendered bytes, including partial output written before a failure.
    pub output: Vec<u8>,
    /// At most one entry; execution stops at the first failure.
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Rendered output as text, lossy on invalid UTF-8.
    pub fn output_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

/// Diagnose-and-repair driver bound to one engine.
pub struct Triage<E> {
    engine: E,
    config: TriageConfig,
}

impl<E: TemplateEngine> Triage<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, TriageConfig::default())
    }

    pub fn with_config(engine: E, config: TriageConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Validate and seed `names`, then diagnose.
    pub fn diagnose_with_names<I, S>(
        &self,
        source: &str,
        names: I,
    ) -> Result<DiagnoseResult<E::Artifact>, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = SymbolRegistry::with_names(names)?;
        Ok(self.diagnose(source, &registry))
    }

    /// Compile `source`, auto-repairing recoverable failures up to the
    /// configured depth.
    ///
    /// Failures accumulate as diagnostics in attempt order. The caller's
    /// registry is cloned up front and never mutated; the clone and the
    /// possibly-masked source come back in the result so a repaired
    /// template can be re-diagnosed or shown to the user.
    pub fn diagnose(&self, source: &str, registry: &SymbolRegistry) -> DiagnoseResult<E::Artifact> {
        let started = Instant::now();
        let request = Uuid::new_v4();
        let span = tracing::debug_span!(
            "diagnose",
            request = %request,
            template = %self.config.template_name
        );
        let _guard = span.enter();

        let mut source = SourceText::new(source);
        let mut registry = registry.clone();
        let mut diagnostics = Vec::new();
        let mut attempts = Vec::new();
        let mut artifact = None;

        for depth in 0..=self.config.max_repair_depth {
            let timestamp = Utc::now();
            let compiled =
                self.engine
                    .compile(&self.config.template_name, source.as_str(), &registry);

            let failure = match compiled {
                Ok(compiled) => {
                    tracing::debug!(depth = depth, "Compile succeeded");
                    attempts.push(AttemptRecord {
                        depth,
                        timestamp,
                        compiled: true,
                        repair: None,
                    });
                    artifact = Some(compiled);
                    break;
                }
                Err(failure) => failure,
            };

            let mut diagnostic = self.decode_compile_failure(&failure, &source);
            let plan = if depth < self.config.max_repair_depth {
                repair::plan(&diagnostic, &source)
            } else {
                // Budget spent: the failure is still reported, unrepaired.
                None
            };

            if let Some(column) = plan.as_ref().and_then(|plan| plan.column) {
                diagnostic.column = Some(column);
            }

            tracing::debug!(
                depth = depth,
                error = %failure,
                repair = %plan
                    .as_ref()
                    .map(|plan| plan.kind.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                "Compile failed"
            );

            diagnostics.push(diagnostic);
            attempts.push(AttemptRecord {
                depth,
                timestamp,
                compiled: false,
                repair: plan.as_ref().map(|plan| plan.kind.clone()),
            });

            match plan {
                Some(plan) => {
                    let (next_source, next_registry) = plan.apply(&source, &registry);
                    source = next_source;
                    registry = next_registry;
                }
                None => break,
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            attempts = attempts.len(),
            diagnostics = diagnostics.len(),
            compiled = artifact.is_some(),
            duration_ms = duration_ms,
            "Diagnose finished"
        );

        DiagnoseResult {
            artifact,
            diagnostics,
            attempts,
            duration_ms,
            source,
            registry,
        }
    }

    /// Evaluate a compiled artifact against `data`. A failure is decoded
    /// into a single exec diagnostic; evaluation is never auto-repaired and
    /// partial output survives.
    pub fn run(&self, artifact: &E::Artifact, data: &Value) -> RunResult {
        let mut output = Vec::new();
        match self.engine.execute(artifact, data, &mut output) {
            Ok(()) => RunResult {
                output,
                diagnostics: Vec::new(),
            },
            Err(failure) => {
                if self.is_empty_template(&failure) {
                    // An artifact with nothing to execute is a valid
                    // outcome, not an error.
                    tracing::debug!(
                        template = %self.config.template_name,
                        "Empty artifact, nothing to execute"
                    );
                    return RunResult {
                        output,
                        diagnostics: Vec::new(),
                    };
                }
                tracing::debug!(error = %failure, "Execution failed");
                let diagnostic = decode(failure.message(), Severity::Exec);
                RunResult {
                    output,
                    diagnostics: vec![diagnostic],
                }
            }
        }
    }

    /// Decode a compile failure and try to resolve a missing column from
    /// the quoted token on the flagged line of the current source.
    fn decode_compile_failure(&self, failure: &EngineError, source: &SourceText) -> Diagnostic {
        let mut diagnostic = decode(failure.message(), Severity::Parse);
        if diagnostic.column.is_none() {
            if let Some(line) = diagnostic.line.and_then(|index| source.line(index)) {
                diagnostic.column = locate_token(&diagnostic.description, line);
            }
        }
        diagnostic
    }

    /// Exact message the engine emits for an artifact with no content.
    fn is_empty_template(&self, failure: &EngineError) -> bool {
        let name = &self.config.template_name;
        failure.message()
            == format!(
                "template: {}: \"{}\" is an incomplete or empty template",
                name, name
            )
    }
}
