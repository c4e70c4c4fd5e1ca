//! Native URCL backend
//!
//! Implements [`Backend`] without any external interpreter:
//!
//! - [`assembler`]: `.urcl` source → instruction list and label table
//! - [`machine`]: the `Execute` routine, one instruction per step
//! - [`script`]: expressions for the snapshot extractor and `.urs` modules
//! - [`scope`]: the variable map every module and step works against
//!
//! # Module Kinds
//!
//! | Extension | Effect                                                     |
//! |-----------|------------------------------------------------------------|
//! | `.urcl`   | resets machine state and binds a freshly assembled program |
//! | `.urs`    | runs assignment statements on top of the current bindings  |
//!
//! Loading a `.urcl` module binds `RAM`, `ROM`, `IP`, `HALT`, `BREAK`, `STEP`,
//! `STACK`, every used register (starting at 0), one `LABEL_<name>` per label
//! and the `Execute` routine.

pub mod assembler;
pub mod machine;
pub mod scope;
pub mod script;

use crate::backend::value::Value;
use crate::backend::{
    Backend, EvalError, ExecError, LoadError, ModuleSource, BREAK_VAR, ENTRY_ROUTINE, HALT_VAR,
    STEP_VAR,
};
use assembler::{label_variable, Program};
use log::debug;
use rustc_hash::FxHashMap;
pub use scope::UrclScope;

/// Backend that assembles and runs URCL in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct UrclBackend;

impl UrclBackend {
    pub fn new() -> Self {
        UrclBackend
    }

    /// Bind an assembled program, replacing any previous machine state
    fn bind_program(scope: &mut UrclScope, program: &Program) {
        scope.set("RAM", Value::Map(FxHashMap::default()));
        scope.set("IP", 0);
        scope.set(HALT_VAR, false);
        scope.set(BREAK_VAR, false);
        scope.set(STEP_VAR, false);
        scope.set("STACK", Value::List(Vec::new()));

        for register in program.registers() {
            scope.set(register, 0);
        }
        for (label, position) in &program.labels {
            scope.set(label_variable(label), *position as i64);
        }

        let rom = program
            .instructions
            .iter()
            .map(|inst| {
                let mut fields = FxHashMap::default();
                fields.insert("Source".to_string(), Value::Text(inst.to_string()));
                fields.insert("Operation".to_string(), Value::Text(inst.operation.clone()));
                fields.insert(
                    "Operands".to_string(),
                    Value::List(inst.operands.iter().map(|o| Value::Text(o.clone())).collect()),
                );
                Value::Object(fields)
            })
            .collect();
        scope.set("ROM", Value::List(rom));
        scope.set(ENTRY_ROUTINE, Value::Routine(ENTRY_ROUTINE.to_string()));
    }
}

impl Backend for UrclBackend {
    type Scope = UrclScope;

    fn create_scope(&self) -> UrclScope {
        UrclScope::new()
    }

    fn load_source(&self, scope: &mut UrclScope, source: &ModuleSource) -> Result<(), LoadError> {
        match source.extension().as_deref() {
            Some("urcl") => {
                let program = assembler::assemble(&source.text)
                    .map_err(|e| LoadError::new(e.to_string()))?;
                debug!(
                    "assembled {}: {} instructions, {} labels",
                    source.name,
                    program.instructions.len(),
                    program.labels.len()
                );
                Self::bind_program(scope, &program);
                Ok(())
            }
            Some("urs") => {
                script::run_script(&source.text, scope).map_err(|e| LoadError::new(e.to_string()))
            }
            _ => Err(LoadError::new("File format is not supported.")),
        }
    }

    fn read_variable(&self, scope: &UrclScope, name: &str) -> Option<Value> {
        scope.get(name).cloned()
    }

    fn variable_names(&self, scope: &UrclScope) -> Vec<String> {
        scope.names().map(str::to_string).collect()
    }

    fn set_variable(&self, scope: &mut UrclScope, name: &str, value: Value) {
        scope.set(name, value);
    }

    fn call_routine(&self, scope: &mut UrclScope, name: &str) -> Result<(), ExecError> {
        let is_entry = match scope.get(name) {
            Some(Value::Routine(routine)) => routine == ENTRY_ROUTINE,
            Some(other) => {
                return Err(ExecError::new(format!(
                    "'{}' object is not callable",
                    other.type_name()
                )))
            }
            None => return Err(ExecError::new(format!("name '{}' is not defined", name))),
        };
        if !is_entry {
            return Err(ExecError::new(format!("routine '{}' has no body", name)));
        }
        machine::execute(scope)
    }

    fn evaluate_expression(&self, scope: &UrclScope, expr: &str) -> Result<Value, EvalError> {
        let parsed = script::parse_expression(expr).map_err(EvalError::Unavailable)?;
        script::evaluate(&parsed, scope)
    }
}
