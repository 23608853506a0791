//! Symbol registry: the function table handed to the compiler.
//!
//! Caller-supplied names go through syntactic identifier validation before
//! registration, so a bad name is a typed error instead of a compiler
//! panic to catch. The repair loop bypasses that validation on purpose:
//! when the compiler reports `function "x" not defined`, the exact reported
//! token is stubbed, because the compiler is the authority on what the
//! template referenced.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::engine::EngineError;

/// Callable bound to a symbol name. Stubs installed during repair perform
/// no operation and signal no error.
pub type TemplateFn = Arc<dyn Fn(&[Value]) -> Result<Value, EngineError> + Send + Sync>;

/// Symbol name rejected by validated registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("bad function name provided: \"{name}\"")]
    InvalidName { name: String },
}

impl RegistryError {
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }
}

/// Name-to-callable table passed through the engine seam at compile time.
///
/// Cloning is cheap (the callables are shared); the repair loop relies on
/// that to grow a private copy without ever touching the caller's registry.
#[derive(Clone, Default)]
pub struct SymbolRegistry {
    symbols: HashMap<String, TemplateFn>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with validated names, each bound to the no-op
    /// placeholder. Fails on the first invalid name.
    pub fn with_names<I, S>(names: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name.as_ref(), noop())?;
        }
        Ok(registry)
    }

    /// Validated insertion of a caller-supplied callable. Re-registering a
    /// name replaces the previous callable.
    pub fn register(&mut self, name: &str, func: TemplateFn) -> Result<(), RegistryError> {
        if !is_valid_name(name) {
            return Err(RegistryError::invalid_name(name));
        }
        self.symbols.insert(name.to_string(), func);
        Ok(())
    }

    /// Unvalidated insertion of the no-op placeholder under `name`, exactly
    /// as the compiler reported it. Repair path only.
    pub fn stub(&mut self, name: &str) {
        self.symbols.insert(name.to_string(), noop());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFn> {
        self.symbols.get(name)
    }

    /// Invoke a registered callable. `None` when the name is unknown.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Result<Value, EngineError>> {
        let func = self.symbols.get(name)?;
        Some(func.as_ref()(args))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Registered names, sorted for stable display and assertions.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for SymbolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Placeholder callable: performs no operation, signals no error.
fn noop() -> TemplateFn {
    Arc::new(|_args: &[Value]| Ok(Value::Null))
}

/// Identifier grammar for function names: a letter or underscore head,
/// then letters, digits, or underscores.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(head) if head.is_alphabetic() || head == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
