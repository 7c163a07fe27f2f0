//! P-code instructions and the append-only stream the parser writes to.
//!
//! An instruction is the triple `(opcode, level difference, operand)`.
//! The stack machine that runs it walks `level` static links to find the
//! frame of a variable or procedure; `operand` is an immediate value, a
//! frame offset, an `Operation` code, or an absolute instruction index.

use std::collections::BTreeSet;
use std::fmt;

/// Slots at the bottom of every frame reserved for the machine:
/// static link, dynamic link and return address.
pub const FRAME_BASE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    LoadConst,
    Operation,
    LoadVar,
    StoreVar,
    Call,
    ReserveFrame,
    Jump,
    JumpIfFalse,
    Read,
    Write,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::LoadConst => "LIT",
            OpCode::Operation => "OPR",
            OpCode::LoadVar => "LOD",
            OpCode::StoreVar => "STO",
            OpCode::Call => "CAL",
            OpCode::ReserveFrame => "INT",
            OpCode::Jump => "JMP",
            OpCode::JumpIfFalse => "JPC",
            OpCode::Read => "RED",
            OpCode::Write => "WRT",
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIfFalse)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operand codes of the `Operation` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opr {
    Return = 0,
    Negate = 1,
    Add = 2,
    Subtract = 3,
    Multiply = 4,
    Divide = 5,
    Odd = 6,
    Equal = 8,
    NotEqual = 9,
    Less = 10,
    GreaterEqual = 11,
    Greater = 12,
    LessEqual = 13,
}

impl Opr {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// The comparison named by a relational operator token.
    pub fn relational(text: &str) -> Option<Opr> {
        match text {
            "=" => Some(Opr::Equal),
            "<>" => Some(Opr::NotEqual),
            "<" => Some(Opr::Less),
            ">=" => Some(Opr::GreaterEqual),
            ">" => Some(Opr::Greater),
            "<=" => Some(Opr::LessEqual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub op: OpCode,
    pub level: usize,
    pub operand: i64,
}

impl Instruction {
    pub fn new(op: OpCode, level: usize, operand: i64) -> Self {
        Instruction { op, level, operand }
    }
}

/// Renders as `(LIT, 0, 10)`, the form the interpreter reads.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.op, self.level, self.operand)
    }
}

/// Append-only instruction buffer with forward-jump patching.
#[derive(Debug, Default)]
pub struct InstructionStream {
    code: Vec<Instruction>,
    /// Jumps emitted with a placeholder target and not yet patched.
    pending: BTreeSet<usize>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, op: OpCode, level: usize, operand: i64) -> usize {
        self.code.push(Instruction::new(op, level, operand));
        self.code.len() - 1
    }

    pub fn emit_operation(&mut self, opr: Opr) -> usize {
        self.emit(OpCode::Operation, 0, opr.code())
    }

    /// Emit a jump whose target is not known yet; it must be patched
    /// exactly once with [`InstructionStream::patch`].
    pub fn emit_forward_jump(&mut self, op: OpCode) -> usize {
        debug_assert!(op.is_jump(), "{op} is not a jump");
        let index = self.emit(op, 0, 0);
        self.pending.insert(index);
        index
    }

    /// Overwrite the operand of the forward jump at `index`.
    pub fn patch(&mut self, index: usize, target: usize) {
        let was_pending = self.pending.remove(&index);
        debug_assert!(was_pending, "instruction {index} is not an unpatched jump");
        if let Some(instruction) = self.code.get_mut(index) {
            instruction.operand = target as i64;
        }
    }

    /// Patch the forward jump at `index` to the next instruction emitted.
    pub fn patch_here(&mut self, index: usize) {
        let here = self.len();
        self.patch(index, here);
    }

    /// Index the next emitted instruction will get.
    pub(crate) fn len(&self) -> usize {
        self.code.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.code.iter()
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        debug_assert!(self.pending.is_empty(), "unpatched jumps at {:?}", self.pending);
        self.code
    }
}

/// One instruction per line, in stream order.
pub fn render_listing(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for instruction in instructions {
        out.push_str(&instruction.to_string());
        out.push('\n');
    }
    out
}
