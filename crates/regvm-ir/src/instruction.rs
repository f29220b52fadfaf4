//! Instruction set for the register machine.

use regvm_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of integers in an instruction feature.
pub const INSTRUCTION_DIM: usize = 3;

/// Operand shape of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arity {
    /// No register operands (`end`)
    Nullary,
    /// One register operand
    Unary,
    /// Two register operands
    Binary,
}

/// Machine opcode. Discriminants are the feature ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opcode {
    // Block markers
    End = 0,
    Rep = 1,

    // Register arithmetic
    Inc = 2,
    Dec = 3,
    Mov = 4,

    // Conditional block opener
    Cmp = 5,

    // Memory
    Load = 6,
    Save = 7,
}

impl Opcode {
    pub const COUNT: usize = 8;

    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::End,
        Opcode::Rep,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Mov,
        Opcode::Cmp,
        Opcode::Load,
        Opcode::Save,
    ];

    pub fn id(&self) -> i32 {
        *self as i32
    }

    pub fn from_id(id: i32) -> Option<Opcode> {
        usize::try_from(id).ok().and_then(|i| Opcode::ALL.get(i).copied())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::End => "end",
            Opcode::Rep => "rep",
            Opcode::Inc => "inc",
            Opcode::Dec => "dec",
            Opcode::Mov => "mov",
            Opcode::Cmp => "cmp",
            Opcode::Load => "load",
            Opcode::Save => "save",
        }
    }

    /// Case-insensitive lookup of a textual opcode name
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    /// Returns the number and kind of register operands this opcode expects
    pub fn arity(&self) -> Arity {
        match self {
            Opcode::End => Arity::Nullary,
            Opcode::Rep | Opcode::Inc | Opcode::Dec => Arity::Unary,
            Opcode::Mov | Opcode::Cmp | Opcode::Load | Opcode::Save => Arity::Binary,
        }
    }

    /// Returns true if this opcode opens a block closed by a later `end`
    pub fn is_block_opener(&self) -> bool {
        matches!(self, Opcode::Rep | Opcode::Cmp)
    }

    /// Returns true for opcodes excluded when sampling loop-free programs
    pub fn is_loop_construct(&self) -> bool {
        matches!(self, Opcode::End | Opcode::Rep | Opcode::Cmp)
    }

    /// Repeating one of these back to back leaves the machine state as a single
    /// occurrence would.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Opcode::Mov | Opcode::Cmp | Opcode::Load | Opcode::Save)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single machine instruction. Unused operands hold [`Instruction::NO_ARG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg1: i32,
    pub arg2: i32,
}

impl Instruction {
    pub const NO_ARG: i32 = -1;

    pub fn new(opcode: Opcode, arg1: i32, arg2: i32) -> Self {
        Self { opcode, arg1, arg2 }
    }

    pub fn end() -> Self {
        Self::new(Opcode::End, Self::NO_ARG, Self::NO_ARG)
    }

    pub fn unary(opcode: Opcode, reg: i32) -> Self {
        Self::new(opcode, reg, Self::NO_ARG)
    }

    pub fn binary(opcode: Opcode, a: i32, b: i32) -> Self {
        Self::new(opcode, a, b)
    }

    pub fn rep(reg: i32) -> Self {
        Self::unary(Opcode::Rep, reg)
    }

    pub fn inc(reg: i32) -> Self {
        Self::unary(Opcode::Inc, reg)
    }

    pub fn dec(reg: i32) -> Self {
        Self::unary(Opcode::Dec, reg)
    }

    pub fn mov(dst: i32, src: i32) -> Self {
        Self::binary(Opcode::Mov, dst, src)
    }

    pub fn cmp(a: i32, b: i32) -> Self {
        Self::binary(Opcode::Cmp, a, b)
    }

    pub fn load(dst: i32, addr: i32) -> Self {
        Self::binary(Opcode::Load, dst, addr)
    }

    pub fn save(src: i32, addr: i32) -> Self {
        Self::binary(Opcode::Save, src, addr)
    }

    /// Register operands the linker checks, in operand order
    pub fn register_operands(&self) -> Vec<i32> {
        match self.opcode.arity() {
            Arity::Nullary => Vec::new(),
            Arity::Unary => vec![self.arg1],
            Arity::Binary => vec![self.arg1, self.arg2],
        }
    }

    /// Fixed `(opcode, arg1, arg2)` integer encoding
    pub fn feature(&self) -> [i32; INSTRUCTION_DIM] {
        [self.opcode.id(), self.arg1, self.arg2]
    }

    /// Inverse of [`Instruction::feature`]
    pub fn from_feature(feature: [i32; INSTRUCTION_DIM]) -> Option<Self> {
        Opcode::from_id(feature[0]).map(|op| Self::new(op, feature[1], feature[2]))
    }
}

impl FromStr for Instruction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| Error::parse(s, "empty instruction"))?;
        let opcode = Opcode::from_name(name)
            .ok_or_else(|| Error::parse(s, format!("no such instruction `{}`", name)))?;

        let mut args = [Instruction::NO_ARG; 2];
        for slot in args.iter_mut() {
            match tokens.next() {
                Some(tok) => {
                    *slot = tok
                        .parse::<i32>()
                        .map_err(|e| Error::parse(s, format!("bad operand `{}`: {}", tok, e)))?;
                }
                None => break,
            }
        }
        if let Some(extra) = tokens.next() {
            return Err(Error::parse(s, format!("unexpected operand `{}`", extra)));
        }

        Ok(Instruction::new(opcode, args[0], args[1]))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        // Trailing unused operands are dropped; a leading placeholder is kept
        // so that arg2 stays in its position.
        if self.arg1 != Self::NO_ARG || self.arg2 != Self::NO_ARG {
            write!(f, " {}", self.arg1)?;
        }
        if self.arg2 != Self::NO_ARG {
            write!(f, " {}", self.arg2)?;
        }
        Ok(())
    }
}
