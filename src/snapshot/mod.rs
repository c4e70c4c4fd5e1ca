// Machine state snapshots extracted after every step

pub mod diff;

use crate::backend::value::Value;
use crate::backend::{Backend, EvalError};
use log::trace;
use std::fmt;

pub use diff::{Change, DiffEngine, SnapshotDelta};

/// A register: an integer or boolean variable of the scope
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub name: String,
    pub value: Value,
}

impl Register {
    pub fn text(&self) -> String {
        self.value.render()
    }
}

/// Instruction listing with the instruction pointer
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramListing {
    pub instruction_pointer: i64,
    pub instructions: Vec<String>,
}

impl ProgramListing {
    /// Index of the instruction about to run, if it lies inside the listing
    pub fn current(&self) -> Option<usize> {
        usize::try_from(self.instruction_pointer)
            .ok()
            .filter(|&i| i < self.instructions.len())
    }
}

/// Stack cells with the stack pointer
#[derive(Debug, Clone, PartialEq)]
pub struct StackView {
    pub stack_pointer: i64,
    pub cells: Vec<String>,
}

impl StackView {
    /// Raw active index, `-SP - 1`. May fall outside the cells.
    pub fn active_index(&self) -> i64 {
        -self.stack_pointer - 1
    }

    /// Active cell, `None` when the index is out of range
    pub fn active(&self) -> Option<usize> {
        usize::try_from(self.active_index())
            .ok()
            .filter(|&i| i < self.cells.len())
    }
}

/// One row of the memory listing
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryRow {
    /// Addresses between the neighbouring cells are absent
    Gap,
    Cell { address: i64, value: String },
}

impl fmt::Display for MemoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryRow::Gap => write!(f, "..."),
            MemoryRow::Cell { address, value } => write!(f, "{}: {}", address, value),
        }
    }
}

/// Immutable view of machine state at one instant.
///
/// Holds no reference back to the scope it was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineSnapshot {
    pub registers: Vec<Register>,
    pub program: Option<ProgramListing>,
    pub stack: Option<StackView>,
    pub memory: Vec<MemoryRow>,
}

impl MachineSnapshot {
    /// Read every category from a scope. A failing category comes back empty.
    pub fn extract<B: Backend>(backend: &B, scope: &B::Scope) -> Self {
        MachineSnapshot {
            registers: extract_registers(backend, scope),
            program: extract_program(backend, scope).unwrap_or_else(|e| {
                trace!("program listing unavailable: {}", e);
                None
            }),
            stack: extract_stack(backend, scope).unwrap_or_else(|e| {
                trace!("stack unavailable: {}", e);
                None
            }),
            memory: extract_memory(backend, scope).unwrap_or_else(|e| {
                trace!("memory unavailable: {}", e);
                Vec::new()
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
            && self.program.is_none()
            && self.stack.is_none()
            && self.memory.is_empty()
    }

    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Addresses present in memory, in display order
    pub fn memory_addresses(&self) -> impl Iterator<Item = i64> + '_ {
        self.memory.iter().filter_map(|row| match row {
            MemoryRow::Cell { address, .. } => Some(*address),
            MemoryRow::Gap => None,
        })
    }
}

/// Display order for registers: shorter names first, then lexical
pub fn sort_registers(registers: &mut [Register]) {
    registers.sort_by(|a, b| {
        a.name
            .len()
            .cmp(&b.name.len())
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn extract_registers<B: Backend>(backend: &B, scope: &B::Scope) -> Vec<Register> {
    let mut registers: Vec<Register> = backend
        .variable_names(scope)
        .into_iter()
        .filter_map(|name| {
            let value = backend.read_variable(scope, &name)?;
            value.is_register().then_some(Register { name, value })
        })
        .collect();
    sort_registers(&mut registers);
    registers
}

/// Integer variable or `None` if unbound or of another type
fn int_variable<B: Backend>(backend: &B, scope: &B::Scope, name: &str) -> Option<i64> {
    backend.read_variable(scope, name)?.as_int()
}

fn length<B: Backend>(backend: &B, scope: &B::Scope, name: &str) -> Result<usize, EvalError> {
    let len = backend.evaluate_expression(scope, &format!("len({})", name))?;
    len.as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EvalError::Unavailable(format!("len({}) is not a length", name)))
}

fn text<B: Backend>(backend: &B, scope: &B::Scope, expr: &str) -> Result<String, EvalError> {
    backend
        .evaluate_expression(scope, &format!("str({})", expr))
        .map(|v| v.render())
}

fn extract_program<B: Backend>(
    backend: &B,
    scope: &B::Scope,
) -> Result<Option<ProgramListing>, EvalError> {
    if backend.read_variable(scope, "ROM").is_none() {
        return Ok(None);
    }
    let Some(instruction_pointer) = int_variable(backend, scope, "IP") else {
        return Ok(None);
    };

    let instructions = (0..length(backend, scope, "ROM")?)
        .map(|i| text(backend, scope, &format!("ROM[{}].Source", i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(ProgramListing {
        instruction_pointer,
        instructions,
    }))
}

fn extract_stack<B: Backend>(backend: &B, scope: &B::Scope) -> Result<Option<StackView>, EvalError> {
    if backend.read_variable(scope, "STACK").is_none() {
        return Ok(None);
    }
    let Some(stack_pointer) = int_variable(backend, scope, "SP") else {
        return Ok(None);
    };

    let cells = (0..length(backend, scope, "STACK")?)
        .map(|i| text(backend, scope, &format!("STACK[{}]", i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(StackView {
        stack_pointer,
        cells,
    }))
}

fn extract_memory<B: Backend>(backend: &B, scope: &B::Scope) -> Result<Vec<MemoryRow>, EvalError> {
    let ram = backend
        .read_variable(scope, "RAM")
        .ok_or_else(|| EvalError::Undefined("RAM".to_string()))?;
    let map = ram
        .as_map()
        .ok_or_else(|| EvalError::Unavailable(format!("RAM is a {}", ram.type_name())))?;

    let mut addresses: Vec<i64> = map.keys().copied().collect();
    addresses.sort_unstable();
    Ok(memory_rows(
        addresses.into_iter().map(|addr| (addr, map[&addr].render())),
    ))
}

/// Lay out sorted `(address, value)` cells, inserting a gap before every
/// address that does not follow its predecessor. The predecessor of the first
/// cell is taken to be `-1`.
pub fn memory_rows(cells: impl IntoIterator<Item = (i64, String)>) -> Vec<MemoryRow> {
    let mut rows = Vec::new();
    let mut last = -1i64;
    for (address, value) in cells {
        if last.checked_add(1) != Some(address) {
            rows.push(MemoryRow::Gap);
        }
        last = address;
        rows.push(MemoryRow::Cell { address, value });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, value: i64) -> Register {
        Register {
            name: name.to_string(),
            value: Value::Int(value),
        }
    }

    #[test]
    fn test_sort_registers_by_length_then_name() {
        let mut registers = vec![register("R10", 0), register("SP", 0), register("R2", 0), register("IP", 0)];
        sort_registers(&mut registers);
        let names: Vec<&str> = registers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["IP", "R2", "SP", "R10"]);
    }

    #[test]
    fn test_memory_rows_gap_before_non_contiguous_address() {
        let rows = memory_rows(vec![(0, "a".to_string()), (1, "b".to_string()), (5, "c".to_string())]);
        let rendered: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
        assert_eq!(rendered, ["0: a", "1: b", "...", "5: c"]);

        // Negative addresses never follow the -1 sentinel
        let rows = memory_rows(vec![(-1, "x".to_string())]);
        assert_eq!(rows[0], MemoryRow::Gap);
    }

    #[test]
    fn test_stack_active_index() {
        let stack = StackView {
            stack_pointer: -1,
            cells: vec!["1".into(), "2".into(), "3".into()],
        };
        assert_eq!(stack.active_index(), 0);
        assert_eq!(stack.active(), Some(0));

        let past_end = StackView {
            stack_pointer: -4,
            ..stack.clone()
        };
        assert_eq!(past_end.active_index(), 3);
        assert_eq!(past_end.active(), None);

        let empty = StackView {
            stack_pointer: 0,
            ..stack
        };
        assert_eq!(empty.active(), None);
    }

    #[test]
    fn test_program_current_requires_ip_in_range() {
        let mut program = ProgramListing {
            instruction_pointer: 1,
            instructions: vec!["NOP".into(), "HLT".into()],
        };
        assert_eq!(program.current(), Some(1));
        program.instruction_pointer = 2;
        assert_eq!(program.current(), None);
        program.instruction_pointer = -1;
        assert_eq!(program.current(), None);
    }
}
