//! Linked programs: instructions plus resolved block boundaries.

use crate::instruction::{Instruction, Opcode};
use crate::validation::validate_registers;
use regvm_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of block opened by `rep` or `cmp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// `rep ... end`, linked in both directions
    Loop,
    /// `cmp ... end`, linked start to end only
    Conditional,
}

/// A matched block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub kind: BlockKind,
}

/// Jump table from block-opening (and loop-closing) indices to their partner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMap {
    targets: BTreeMap<usize, usize>,
    blocks: Vec<Block>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn close(&mut self, start: usize, end: usize, kind: BlockKind) {
        self.targets.insert(start, end);
        if kind == BlockKind::Loop {
            self.targets.insert(end, start);
        }
        self.blocks.push(Block { start, end, kind });
    }

    /// Jump target recorded for `index`, if it is a key
    pub fn target(&self, index: usize) -> Option<usize> {
        self.targets.get(&index).copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.targets.contains_key(&index)
    }

    /// Number of keys in the jump table
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets.iter().map(|(k, v)| (*k, *v))
    }

    /// Matched blocks in closing order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

/// An executable program.
///
/// Built once by [`Program::link`] and never patched: removing or inserting an
/// instruction can move every later block boundary, so edits relink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    source: Vec<Instruction>,
    code: Vec<Instruction>,
    block_map: BlockMap,
    num_registers: usize,
}

/// Serialized form of a program; linking is redone on load.
#[derive(Serialize, Deserialize)]
struct ProgramImage {
    num_registers: usize,
    instructions: Vec<Instruction>,
}

impl Program {
    /// Check register operands, match blocks and append synthetic `end`s for
    /// blocks still open at the end of the program.
    pub fn link(instructions: &[Instruction], num_registers: usize) -> Result<Self> {
        validate_registers(instructions, num_registers)?;

        let mut block_map = BlockMap::new();
        let mut open: Vec<(usize, BlockKind)> = Vec::new();

        for (i, inst) in instructions.iter().enumerate() {
            match inst.opcode {
                Opcode::Rep => open.push((i, BlockKind::Loop)),
                Opcode::Cmp => open.push((i, BlockKind::Conditional)),
                Opcode::End => {
                    // An `end` with nothing open is padding.
                    if let Some((start, kind)) = open.pop() {
                        block_map.close(start, i, kind);
                    }
                }
                _ => {}
            }
        }

        let mut code = instructions.to_vec();
        while let Some((start, kind)) = open.pop() {
            block_map.close(start, code.len(), kind);
            code.push(Instruction::end());
        }

        tracing::trace!(
            source_len = instructions.len(),
            linked_len = code.len(),
            blocks = block_map.blocks().len(),
            "Linked program"
        );

        Ok(Self {
            source: instructions.to_vec(),
            code,
            block_map,
            num_registers,
        })
    }

    /// The empty program, which ends immediately
    pub fn empty(num_registers: usize) -> Self {
        Self {
            source: Vec::new(),
            code: Vec::new(),
            block_map: BlockMap::new(),
            num_registers,
        }
    }

    /// Instructions as executed, including synthetic `end`s
    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    /// Instructions as supplied to [`Program::link`]
    pub fn source(&self) -> &[Instruction] {
        &self.source
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.code.get(pc)
    }

    /// Executable length, including synthetic `end`s
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Number of `end`s appended to close open blocks
    pub fn synthetic_ends(&self) -> usize {
        self.code.len() - self.source.len()
    }

    pub fn num_registers(&self) -> usize {
        self.num_registers
    }

    pub fn block_map(&self) -> &BlockMap {
        &self.block_map
    }

    /// Copy of the source with instruction `index` removed, relinked
    pub fn without(&self, index: usize) -> Result<Self> {
        if index >= self.source.len() {
            return Err(Error::Validation(format!(
                "index {} out of range for {} instructions",
                index,
                self.source.len()
            )));
        }
        let mut instructions = self.source.clone();
        instructions.remove(index);
        Self::link(&instructions, self.num_registers)
    }

    /// Serialize the program to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let image = ProgramImage {
            num_registers: self.num_registers,
            instructions: self.source.clone(),
        };
        Ok(bincode::serialize(&image)?)
    }

    /// Deserialize and relink a program from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image: ProgramImage = bincode::deserialize(bytes)?;
        Self::link(&image.instructions, image.num_registers)
    }
}
