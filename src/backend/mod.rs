//! Execution backend boundary
//!
//! The debugger never interprets program text itself. Everything it knows
//! about a running program comes through the [`Backend`] trait:
//!
//! - [`value`]: tagged [`Value`] variants exchanged with the backend
//! - [`urcl`]: the native URCL backend used by the terminal application
//!
//! # Variable Contract
//!
//! Backends are expected to expose, by convention:
//!
//! | Name    | Access | Shape                              |
//! |---------|--------|------------------------------------|
//! | `STEP`  | write  | bool                               |
//! | `HALT`  | read   | bool (absent means halted)         |
//! | `BREAK` | read   | bool (absence tolerated)           |
//! | `IP`    | read   | int                                |
//! | `ROM`   | read   | sequence of objects with `Source`  |
//! | `SP`    | read   | int                                |
//! | `STACK` | read   | sequence                           |
//! | `RAM`   | read   | map of int to value                |
//!
//! and a zero-argument entry routine named `Execute` that performs one step.

pub mod urcl;
pub mod value;

pub use urcl::UrclBackend;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use value::Value;

/// Flag set to `true` before every step
pub const STEP_VAR: &str = "STEP";
/// Halt signal; absence means the program is halted
pub const HALT_VAR: &str = "HALT";
/// Break signal raised by the program
pub const BREAK_VAR: &str = "BREAK";
/// Entry routine that performs one step
pub const ENTRY_ROUTINE: &str = "Execute";

/// A module failed to load into a scope
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        LoadError {
            message: message.into(),
        }
    }
}

/// A step raised an error while executing
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ExecError {
    pub message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        ExecError {
            message: message.into(),
        }
    }
}

/// An expression could not be evaluated against a scope
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    Undefined(String),

    #[error("{0}")]
    Unavailable(String),
}

/// One unit of program source, identified by name
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSource {
    pub name: String,
    pub path: Option<PathBuf>,
    pub text: String,
}

impl ModuleSource {
    /// A module whose text lives only in memory
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        ModuleSource {
            name: name.into(),
            path: None,
            text: text.into(),
        }
    }

    /// A file-backed module; its text is read whenever it is (re)loaded
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        ModuleSource {
            name: path.display().to_string(),
            path: Some(path.to_path_buf()),
            text: String::new(),
        }
    }

    /// Re-read file-backed text so a rebuild sees the current file contents
    pub fn refresh(&mut self) -> Result<(), LoadError> {
        if let Some(path) = &self.path {
            self.text = fs::read_to_string(path)
                .map_err(|e| LoadError::new(format!("{}: {}", path.display(), e)))?;
        }
        Ok(())
    }

    /// File name shown in menus (the last path component)
    pub fn display_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    /// Lower-cased file extension of the module name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Capability interface over an opaque execution engine.
///
/// Implementations may embed an interpreter or talk to a subprocess; the
/// debugger core relies only on these operations.
pub trait Backend {
    /// Live variable bindings produced by loading modules
    type Scope: Clone;

    /// Create a fresh, empty, independent scope
    fn create_scope(&self) -> Self::Scope;

    /// Run a module against a scope. Bindings made before a failure stay.
    fn load_source(&self, scope: &mut Self::Scope, source: &ModuleSource) -> Result<(), LoadError>;

    /// Read a variable, `None` when unbound
    fn read_variable(&self, scope: &Self::Scope, name: &str) -> Option<Value>;

    /// Names of every bound variable, in no particular order
    fn variable_names(&self, scope: &Self::Scope) -> Vec<String>;

    /// Bind or overwrite a variable
    fn set_variable(&self, scope: &mut Self::Scope, name: &str, value: Value);

    /// Invoke a zero-argument routine bound in the scope
    fn call_routine(&self, scope: &mut Self::Scope, name: &str) -> Result<(), ExecError>;

    /// Evaluate a read-only expression such as `len(ROM)` or `str(STACK[2])`
    fn evaluate_expression(&self, scope: &Self::Scope, expr: &str) -> Result<Value, EvalError>;

    /// Perform one step: set `STEP` and call the entry routine
    fn evaluate_step(&self, scope: &mut Self::Scope) -> Result<(), ExecError> {
        self.set_variable(scope, STEP_VAR, Value::Bool(true));
        self.call_routine(scope, ENTRY_ROUTINE)
    }
}
