//! URCL instruction execution
//!
//! The machine keeps no state of its own: registers, `IP`, `SP`, `STACK`,
//! `RAM` and the signal flags all live in the [`UrclScope`]. The ROM is read
//! back from the `ROM` variable on every step, so whatever a module bound
//! there is what runs.
//!
//! # Memory Model
//!
//! A single address space is split by sign:
//!
//! ```text
//! addr >= 0  ->  RAM[addr]          (0 when absent)
//! addr <  0  ->  STACK[-addr - 1]   (0 when absent, grows with zeros on write)
//! ```
//!
//! `SP` starts at 0 and moves down on push, so the top of the stack is the
//! cell at `-SP - 1`. Stores below `-MAX_STACK_CELLS` fail instead of
//! growing the stack.

use super::assembler::{is_label, is_register, label_variable, Opcode, ZERO_REGISTER};
use super::scope::UrclScope;
use super::script::parse_int_literal;
use crate::backend::value::Value;
use crate::backend::{ExecError, BREAK_VAR, HALT_VAR, STEP_VAR};
use rustc_hash::FxHashMap;

const IP: &str = "IP";
const SP: &str = "SP";
const ROM: &str = "ROM";
const RAM: &str = "RAM";
const STACK: &str = "STACK";

/// Deepest stack cell a store may create (`addr >= -MAX_STACK_CELLS`)
const MAX_STACK_CELLS: usize = 1 << 20;

/// Body of the `Execute` routine.
///
/// Clears `BREAK`, then runs instructions until `HALT` is set. Returns after
/// a single instruction when `STEP` is set, or as soon as `BREAK` is raised.
pub fn execute(scope: &mut UrclScope) -> Result<(), ExecError> {
    scope.set(BREAK_VAR, false);

    while !scope.require(HALT_VAR)?.is_truthy() {
        let ip = scope.require_int(IP)?;
        let instruction = fetch(scope, ip)?;
        run(scope, &instruction)?;

        let ip = scope.require_int(IP)?;
        scope.set(IP, ip + 1);

        let step = scope.get(STEP_VAR).is_some_and(Value::is_truthy);
        let brk = scope.get(BREAK_VAR).is_some_and(Value::is_truthy);
        if step || brk {
            return Ok(());
        }
    }

    Ok(())
}

/// Decoded form of a ROM entry
struct Decoded {
    op: Opcode,
    operands: Vec<String>,
}

fn fetch(scope: &UrclScope, ip: i64) -> Result<Decoded, ExecError> {
    let rom = scope.require(ROM)?;
    let entry = rom
        .as_list()
        .and_then(|items| usize::try_from(ip).ok().and_then(|i| items.get(i)))
        .ok_or_else(|| ExecError::new("Instruction pointer is out of bounds."))?;

    let operation = match entry.field("Operation") {
        Some(Value::Text(op)) => op,
        _ => return Err(ExecError::new(format!("ROM[{}] is not an instruction", ip))),
    };
    let op = Opcode::from_mnemonic(operation)
        .ok_or_else(|| ExecError::new(format!("unknown operation \"{}\"", operation)))?;
    let operands = match entry.field("Operands") {
        Some(Value::List(items)) => items.iter().map(Value::render).collect(),
        Some(_) => return Err(ExecError::new(format!("ROM[{}] has malformed operands", ip))),
        None => Vec::new(),
    };

    if operands.len() != op.arity() {
        return Err(ExecError::new(format!(
            "\"{}\" takes {} operand(s), got {}",
            operation,
            op.arity(),
            operands.len()
        )));
    }

    Ok(Decoded { op, operands })
}

/// Resolve an operand to its integer value
fn value_of(scope: &UrclScope, operand: &str) -> Result<i64, ExecError> {
    if operand == ZERO_REGISTER {
        Ok(0)
    } else if is_register(operand) {
        scope.require_int(operand)
    } else if is_label(operand) {
        scope.require_int(&label_variable(operand))
    } else {
        parse_int_literal(operand)
            .ok_or_else(|| ExecError::new(format!("invalid operand \"{}\"", operand)))
    }
}

fn overflow() -> ExecError {
    ExecError::new("integer overflow")
}

/// Stack index of a negative address
fn stack_slot(addr: i64) -> usize {
    (addr + 1).unsigned_abs() as usize
}

fn get(scope: &UrclScope, addr: i64) -> Result<Value, ExecError> {
    if addr < 0 {
        let slot = stack_slot(addr);
        let stack = scope.require(STACK)?;
        let items = stack
            .as_list()
            .ok_or_else(|| ExecError::new("STACK is not a list"))?;
        Ok(items.get(slot).cloned().unwrap_or(Value::Int(0)))
    } else {
        let ram = scope.require(RAM)?;
        let map = ram.as_map().ok_or_else(|| ExecError::new("RAM is not a map"))?;
        Ok(map.get(&addr).cloned().unwrap_or(Value::Int(0)))
    }
}

fn set(scope: &mut UrclScope, addr: i64, value: Value) -> Result<(), ExecError> {
    if addr < 0 {
        let slot = stack_slot(addr);
        if slot >= MAX_STACK_CELLS {
            return Err(ExecError::new(format!("stack address {} is out of range", addr)));
        }
        match scope.get_mut(STACK) {
            Some(Value::List(items)) => {
                if slot >= items.len() {
                    items.resize(slot + 1, Value::Int(0));
                }
                items[slot] = value;
                Ok(())
            }
            Some(_) => Err(ExecError::new("STACK is not a list")),
            None => Err(ExecError::new("name 'STACK' is not defined")),
        }
    } else {
        match scope.get_mut(RAM) {
            Some(Value::Map(map)) => {
                map.insert(addr, value);
                Ok(())
            }
            Some(_) => Err(ExecError::new("RAM is not a map")),
            None => {
                // RAM behaves like a dict created on first store
                let mut map = FxHashMap::default();
                map.insert(addr, value);
                scope.set(RAM, Value::Map(map));
                Ok(())
            }
        }
    }
}

fn push(scope: &mut UrclScope, value: Value) -> Result<(), ExecError> {
    let sp = scope.require_int(SP)?.checked_sub(1).ok_or_else(overflow)?;
    scope.set(SP, sp);
    set(scope, sp, value)
}

fn pop(scope: &mut UrclScope) -> Result<Value, ExecError> {
    let sp = scope.require_int(SP)?;
    if sp >= 0 {
        return Err(ExecError::new("Stack underflow occurred."));
    }
    let value = get(scope, sp)?;
    scope.set(SP, sp + 1);
    Ok(value)
}

/// Jump so that the post-increment lands on `target`
fn jump(scope: &mut UrclScope, target: i64) -> Result<(), ExecError> {
    scope.set(IP, target.checked_sub(1).ok_or_else(overflow)?);
    Ok(())
}

fn shift_count(count: i64) -> Result<u32, ExecError> {
    if count < 0 {
        return Err(ExecError::new("negative shift count"));
    }
    Ok(count.min(63) as u32)
}

fn floor_div(a: i64, b: i64) -> Result<i64, ExecError> {
    if b == 0 {
        return Err(ExecError::new("integer division or modulo by zero"));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    Ok(if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q })
}

fn floor_mod(a: i64, b: i64) -> Result<i64, ExecError> {
    if b == 0 {
        return Err(ExecError::new("integer division or modulo by zero"));
    }
    let r = a.checked_rem(b).ok_or_else(overflow)?;
    Ok(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
}

fn binary(op: Opcode, a: i64, b: i64) -> Result<i64, ExecError> {
    match op {
        Opcode::Add => a.checked_add(b).ok_or_else(overflow),
        Opcode::Sub => a.checked_sub(b).ok_or_else(overflow),
        Opcode::Mlt => a.checked_mul(b).ok_or_else(overflow),
        Opcode::Div => floor_div(a, b),
        Opcode::Mod => floor_mod(a, b),
        Opcode::And => Ok(a & b),
        Opcode::Or => Ok(a | b),
        Opcode::Xor => Ok(a ^ b),
        Opcode::Bsl => {
            let count = shift_count(b)?;
            let shifted = a.checked_shl(count).ok_or_else(overflow)?;
            if shifted >> count != a {
                return Err(overflow());
            }
            Ok(shifted)
        }
        Opcode::Bsr => Ok(a >> shift_count(b)?),
        _ => unreachable!("not a binary operation: {:?}", op),
    }
}

fn condition(op: Opcode, a: i64, b: i64) -> bool {
    match op {
        Opcode::Bre => a == b,
        Opcode::Bne => a != b,
        Opcode::Brl => a < b,
        Opcode::Brg => a > b,
        Opcode::Ble => a <= b,
        Opcode::Bge => a >= b,
        _ => unreachable!("not a branch: {:?}", op),
    }
}

fn run(scope: &mut UrclScope, inst: &Decoded) -> Result<(), ExecError> {
    let ops = &inst.operands;
    match inst.op {
        Opcode::Nop => {}
        Opcode::Hlt => scope.set(HALT_VAR, true),
        Opcode::Brk => scope.set(BREAK_VAR, true),
        Opcode::Ret => {
            let target = pop(scope)?;
            scope.set(IP, target);
        }
        Opcode::Psh => {
            let value = value_of(scope, &ops[0])?;
            push(scope, Value::Int(value))?;
        }
        Opcode::Pop => {
            let value = pop(scope)?;
            scope.set(ops[0].as_str(), value);
        }
        Opcode::Jmp => {
            let target = value_of(scope, &ops[0])?;
            jump(scope, target)?;
        }
        Opcode::Cal => {
            let target = value_of(scope, &ops[0])?;
            let ip = scope.require_int(IP)?;
            push(scope, Value::Int(ip))?;
            jump(scope, target)?;
        }
        Opcode::Lod => {
            let addr = value_of(scope, &ops[1])?;
            let value = get(scope, addr)?;
            scope.set(ops[0].as_str(), value);
        }
        Opcode::Str => {
            let addr = value_of(scope, &ops[0])?;
            let value = value_of(scope, &ops[1])?;
            set(scope, addr, Value::Int(value))?;
        }
        Opcode::Cpy => {
            let target = value_of(scope, &ops[0])?;
            let source = value_of(scope, &ops[1])?;
            let value = get(scope, source)?;
            set(scope, target, value)?;
        }
        Opcode::Mov | Opcode::Imm => {
            let value = value_of(scope, &ops[1])?;
            scope.set(ops[0].as_str(), value);
        }
        Opcode::Lsh | Opcode::Rsh | Opcode::Inc | Opcode::Dec | Opcode::Not => {
            let b = value_of(scope, &ops[1])?;
            let result = match inst.op {
                Opcode::Lsh => binary(Opcode::Bsl, b, 1)?,
                Opcode::Rsh => b >> 1,
                Opcode::Inc => b.checked_add(1).ok_or_else(overflow)?,
                Opcode::Dec => b.checked_sub(1).ok_or_else(overflow)?,
                _ => !b,
            };
            scope.set(ops[0].as_str(), result);
        }
        Opcode::Brz | Opcode::Bnz => {
            let target = value_of(scope, &ops[0])?;
            let b = value_of(scope, &ops[1])?;
            let taken = if inst.op == Opcode::Brz { b == 0 } else { b != 0 };
            if taken {
                jump(scope, target)?;
            }
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mlt
        | Opcode::Div
        | Opcode::Mod
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Bsl
        | Opcode::Bsr => {
            let b = value_of(scope, &ops[1])?;
            let c = value_of(scope, &ops[2])?;
            let result = binary(inst.op, b, c)?;
            scope.set(ops[0].as_str(), result);
        }
        Opcode::Bre | Opcode::Bne | Opcode::Brl | Opcode::Brg | Opcode::Ble | Opcode::Bge => {
            let target = value_of(scope, &ops[0])?;
            let b = value_of(scope, &ops[1])?;
            let c = value_of(scope, &ops[2])?;
            if condition(inst.op, b, c) {
                jump(scope, target)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> UrclScope {
        let mut scope = UrclScope::new();
        scope.set(SP, 0);
        scope.set(STACK, Value::List(Vec::new()));
        scope.set(RAM, Value::Map(FxHashMap::default()));
        scope
    }

    #[test]
    fn test_floor_division_matches_sign_of_divisor() {
        assert_eq!(floor_div(7, 2).unwrap(), 3);
        assert_eq!(floor_div(-7, 2).unwrap(), -4);
        assert_eq!(floor_mod(-7, 2).unwrap(), 1);
        assert_eq!(floor_mod(7, -2).unwrap(), -1);
        assert!(floor_div(1, 0).is_err());
    }

    #[test]
    fn test_push_grows_stack_downwards() {
        let mut scope = machine();
        push(&mut scope, Value::Int(10)).unwrap();
        push(&mut scope, Value::Int(20)).unwrap();
        assert_eq!(scope.get(SP), Some(&Value::Int(-2)));
        assert_eq!(
            scope.get(STACK),
            Some(&Value::List(vec![Value::Int(10), Value::Int(20)]))
        );
        assert_eq!(pop(&mut scope).unwrap(), Value::Int(20));
        assert_eq!(scope.get(SP), Some(&Value::Int(-1)));
    }

    #[test]
    fn test_pop_on_empty_stack_underflows() {
        let mut scope = machine();
        let err = pop(&mut scope).unwrap_err();
        assert_eq!(err.message, "Stack underflow occurred.");
    }

    #[test]
    fn test_store_below_stack_limit_fails_without_growing() {
        let mut scope = machine();
        let deepest = -(MAX_STACK_CELLS as i64);
        set(&mut scope, -3, Value::Int(1)).unwrap();

        let err = set(&mut scope, deepest - 1, Value::Int(1)).unwrap_err();
        assert!(err.message.contains("out of range"));
        let err = set(&mut scope, i64::MIN, Value::Int(1)).unwrap_err();
        assert!(err.message.contains("out of range"));
        assert_eq!(scope.get(STACK).and_then(Value::as_list).map(|l| l.len()), Some(3));

        // reads far below the stack are still zero
        assert_eq!(get(&scope, i64::MIN).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_unset_memory_reads_zero() {
        let scope = machine();
        assert_eq!(get(&scope, 100).unwrap(), Value::Int(0));
        assert_eq!(get(&scope, -5).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_shift_overflow_is_an_error() {
        assert_eq!(binary(Opcode::Bsl, 1, 4).unwrap(), 16);
        assert!(binary(Opcode::Bsl, i64::MAX, 1).is_err());
        assert!(binary(Opcode::Bsr, 8, -1).is_err());
    }
}
