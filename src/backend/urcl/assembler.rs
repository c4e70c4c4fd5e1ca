//! URCL assembler
//!
//! Turns URCL source text into a flat instruction list plus a label table.
//! Every line is one of:
//!
//! - empty or a `//` comment (skipped)
//! - a label: `.name` with no whitespace, marking the next instruction
//! - a header directive (`BITS`, `MINREG`, ...), skipped
//! - an instruction: `OP a, b, c` (commas and whitespace both separate)
//!
//! Operands are kept as text. They are resolved against the scope when the
//! instruction runs, so labels and registers bound by other modules work.

use std::fmt;
use thiserror::Error;

/// Header directives accepted and ignored by the assembler
const HEADERS: &[&str] = &["BITS", "MINREG", "MINHEAP", "MINSTACK", "RUN"];

/// The zero register, always reads as 0
pub const ZERO_REGISTER: &str = "R0";

/// Every operation the machine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    Hlt,
    Brk,
    Ret,
    Psh,
    Pop,
    Jmp,
    Cal,
    Lod,
    Str,
    Mov,
    Imm,
    Lsh,
    Rsh,
    Inc,
    Dec,
    Not,
    Brz,
    Bnz,
    Cpy,
    Add,
    Sub,
    Mlt,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Bsl,
    Bsr,
    Bre,
    Bne,
    Brl,
    Brg,
    Ble,
    Bge,
}

impl Opcode {
    /// Look up an opcode by its (upper-case) mnemonic
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let op = match text {
            "NOP" => Opcode::Nop,
            "HLT" => Opcode::Hlt,
            "BRK" => Opcode::Brk,
            "RET" => Opcode::Ret,
            "PSH" => Opcode::Psh,
            "POP" => Opcode::Pop,
            "JMP" => Opcode::Jmp,
            "CAL" => Opcode::Cal,
            "LOD" => Opcode::Lod,
            "STR" => Opcode::Str,
            "MOV" => Opcode::Mov,
            "IMM" => Opcode::Imm,
            "LSH" => Opcode::Lsh,
            "RSH" => Opcode::Rsh,
            "INC" => Opcode::Inc,
            "DEC" => Opcode::Dec,
            "NOT" => Opcode::Not,
            "BRZ" => Opcode::Brz,
            "BNZ" => Opcode::Bnz,
            "CPY" => Opcode::Cpy,
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "MLT" => Opcode::Mlt,
            "DIV" => Opcode::Div,
            "MOD" => Opcode::Mod,
            "AND" => Opcode::And,
            "OR" => Opcode::Or,
            "XOR" => Opcode::Xor,
            "BSL" => Opcode::Bsl,
            "BSR" => Opcode::Bsr,
            "BRE" => Opcode::Bre,
            "BNE" => Opcode::Bne,
            "BRL" => Opcode::Brl,
            "BRG" => Opcode::Brg,
            "BLE" => Opcode::Ble,
            "BGE" => Opcode::Bge,
            _ => return None,
        };
        Some(op)
    }

    /// Number of operands the opcode takes
    pub fn arity(self) -> usize {
        use Opcode::*;
        match self {
            Nop | Hlt | Brk | Ret => 0,
            Psh | Pop | Jmp | Cal => 1,
            Lod | Str | Mov | Imm | Lsh | Rsh | Inc | Dec | Not | Brz | Bnz | Cpy => 2,
            Add | Sub | Mlt | Div | Mod | And | Or | Xor | Bsl | Bsr | Bre | Bne | Brl | Brg
            | Ble | Bge => 3,
        }
    }

    /// Whether the first operand is a register the instruction assigns
    pub fn writes_first_operand(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Pop | Lod | Mov | Imm | Lsh | Rsh | Inc | Dec | Not | Add | Sub | Mlt | Div | Mod
                | And | Or | Xor | Bsl | Bsr
        )
    }
}

/// One parsed instruction, operands still unresolved
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub operation: String,
    pub operands: Vec<String>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// A single meaningful source line
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label(String),
    Instruction(Instruction),
}

/// Assembly failed; nothing from the module was bound
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct AssembleError {
    pub line: usize,
    pub message: String,
}

/// Assembled module: instructions in ROM order and label positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: Vec<(String, usize)>,
}

impl Program {
    /// Registers referenced by any operand, `SP` first, in first-use order
    pub fn registers(&self) -> Vec<String> {
        let mut registers = vec!["SP".to_string()];
        for operand in self.instructions.iter().flat_map(|i| i.operands.iter()) {
            if is_register(operand) && operand != ZERO_REGISTER && !registers.contains(operand) {
                registers.push(operand.clone());
            }
        }
        registers
    }
}

/// `R<n>` or `SP`
pub fn is_register(operand: &str) -> bool {
    if operand == "SP" {
        return true;
    }
    operand
        .strip_prefix('R')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// `.name` without whitespace
pub fn is_label(operand: &str) -> bool {
    operand.len() > 1 && operand.starts_with('.') && !operand.contains(char::is_whitespace)
}

/// Scope variable that holds a label's position
pub fn label_variable(label: &str) -> String {
    format!("LABEL_{}", label.trim_start_matches('.'))
}

/// Parse one source line; `None` for blank lines, comments and headers
pub fn parse_line(text: &str) -> Option<Line> {
    let code = match text.find("//") {
        Some(pos) => &text[..pos],
        None => text,
    };
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    if is_label(code) {
        return Some(Line::Label(code.to_string()));
    }

    let mut parts = code
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    let operation = parts.next()?.to_ascii_uppercase();
    if HEADERS.contains(&operation.as_str()) {
        return None;
    }
    Some(Line::Instruction(Instruction {
        operation,
        operands: parts.map(str::to_string).collect(),
    }))
}

/// Assemble a whole module
pub fn assemble(source: &str) -> Result<Program, AssembleError> {
    let mut program = Program::default();

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        match parse_line(text) {
            None => {}
            Some(Line::Label(name)) => {
                program.labels.push((name, program.instructions.len()));
            }
            Some(Line::Instruction(inst)) => {
                validate(&inst).map_err(|message| AssembleError { line, message })?;
                program.instructions.push(inst);
            }
        }
    }

    Ok(program)
}

fn validate(inst: &Instruction) -> Result<(), String> {
    let op = Opcode::from_mnemonic(&inst.operation)
        .ok_or_else(|| format!("unknown operation \"{}\"", inst.operation))?;

    let expected = op.arity();
    if inst.operands.len() != expected {
        return Err(format!(
            "\"{}\" takes {} operand(s), got {}",
            inst.operation,
            expected,
            inst.operands.len()
        ));
    }

    if op.writes_first_operand() {
        let target = &inst.operands[0];
        if !is_register(target) || target == ZERO_REGISTER {
            return Err(format!("\"{}\" can not be assigned", target));
        }
    }

    Ok(())
}
