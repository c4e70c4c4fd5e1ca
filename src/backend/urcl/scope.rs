//! Variable bindings for the URCL backend

use crate::backend::value::Value;
use crate::backend::ExecError;
use rustc_hash::FxHashMap;

/// Live variables of one execution environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrclScope {
    vars: FxHashMap<String, Value>,
}

impl UrclScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Read a variable the machine requires, failing like an undefined name
    pub fn require(&self, name: &str) -> Result<&Value, ExecError> {
        self.get(name)
            .ok_or_else(|| ExecError::new(format!("name '{}' is not defined", name)))
    }

    /// Read a variable that must hold an integer
    pub fn require_int(&self, name: &str) -> Result<i64, ExecError> {
        let value = self.require(name)?;
        value.as_int().ok_or_else(|| {
            ExecError::new(format!(
                "'{}' must be an int, not {}",
                name,
                value.type_name()
            ))
        })
    }
}
