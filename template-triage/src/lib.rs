//! Template Triage Library
//!
//! Turns opaque template-compiler failures into positioned diagnostics and
//! auto-repairs the recoverable ones, so a user pasting broken template
//! source sees every fixable problem in one pass instead of only the
//! first.
//!
//! The pipeline, leaf first:
//! - `decode`: parses the compiler's error-message grammar into a
//!   structured [`Diagnostic`]
//! - `locate`: resolves a missing column from the quoted token the
//!   description names, when it occurs exactly once on the flagged line
//! - `repair`: the two healing strategies, symbol stubbing and empty-slot
//!   masking
//! - `triage`: the bounded compile-decode-repair loop
//!   ([`Triage::diagnose`]) and execution diagnostics ([`Triage::run`])
//! - `report`: plain-text rendering with line gutters and carets
//!
//! The compiler itself stays behind the [`TemplateEngine`] trait. Any
//! engine whose failure messages follow the decoded grammar works;
//! [`fakes::FakeEngine`] is the in-memory reference used by the crate's
//! own tests.
//!
//! ```
//! use template_triage::{fakes::FakeEngine, SymbolRegistry, Triage};
//!
//! let triage = Triage::new(FakeEngine::new());
//! let result = triage.diagnose("{{foo}}{{bar}}", &SymbolRegistry::new());
//!
//! assert_eq!(result.diagnostics.len(), 2);
//! assert!(result.artifact.is_some());
//! assert_eq!(result.registry.names(), vec!["bar", "foo"]);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod decode;
pub mod diagnostic;
pub mod engine;
pub mod fakes;
pub mod locate;
pub mod registry;
pub mod repair;
pub mod report;
pub mod source;
pub mod triage;

// Re-export the core data model
pub use diagnostic::{Diagnostic, Severity};
pub use source::{unquote_literal, SourceText, UnquoteError};

// Re-export the engine seam
pub use engine::{EngineError, TemplateEngine};
pub use registry::{RegistryError, SymbolRegistry, TemplateFn};

// Re-export diagnose/repair/run types
pub use repair::{RepairKind, RepairPlan};
pub use triage::{AttemptRecord, DiagnoseResult, RunResult, Triage, TriageConfig};

// Re-export rendering helpers
pub use report::{render_report, render_source};
