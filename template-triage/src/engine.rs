//! Seam to the template compiler and executor.
//!
//! The triage core never sees the engine's parse tree. The whole contract
//! is message-shaped: compilation and execution may fail with an
//! [`EngineError`] whose text follows the grammar handled by
//! [`decode`](crate::decode::decode), and execution may leave partial
//! output behind when it fails. Everything else about the engine is
//! opaque, which is what lets the repair loop work against any conforming
//! implementation ([`fakes::FakeEngine`](crate::fakes::FakeEngine) is the
//! in-repo one).

use serde_json::Value;
use thiserror::Error;

use crate::registry::SymbolRegistry;

/// Failure reported by the engine. The message is data to the triage
/// loop, not an error it propagates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Template compiler and executor the triage loop drives.
pub trait TemplateEngine {
    /// Compiled template, opaque to the triage core.
    type Artifact;

    /// Compile `source` under `name`, with the callables in `registry`
    /// visible to the template.
    fn compile(
        &self,
        name: &str,
        source: &str,
        registry: &SymbolRegistry,
    ) -> Result<Self::Artifact, EngineError>;

    /// Evaluate a compiled artifact against `data`, appending rendered
    /// bytes to `output`. Bytes written before a failure stay in `output`.
    fn execute(
        &self,
        artifact: &Self::Artifact,
        data: &Value,
        output: &mut Vec<u8>,
    ) -> Result<(), EngineError>;
}
