//! Machine state: registers, memory, program counter and run bookkeeping.

use regvm_core::{HaltCode, Memory, Registers};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A `load` or `save` addressed memory outside its bounds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("memory address {addr} out of bounds for {size} cells")]
pub struct MemoryFault {
    pub addr: i32,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    pub(crate) pc: i32,
    /// Serialized for feature compatibility; no opcode writes it.
    pub(crate) flag: i32,
    pub(crate) counter: usize,
    pub(crate) halt: HaltCode,
}

impl MachineState {
    pub fn new(num_registers: usize, memory_size: usize) -> Self {
        Self {
            registers: vec![0; num_registers],
            memory: vec![0; memory_size],
            pc: 0,
            flag: 0,
            counter: 0,
            halt: HaltCode::Running,
        }
    }

    /// Zero registers and memory and rewind to a fresh running state
    pub fn reset(&mut self) {
        self.registers.fill(0);
        self.memory.fill(0);
        self.pc = 0;
        self.flag = 0;
        self.counter = 0;
        self.halt = HaltCode::Running;
    }

    /// Reset, then copy the overlapping prefix of `registers` and `memory`
    pub fn init(&mut self, registers: &[i32], memory: &[i32]) {
        self.reset();
        copy_prefix(&mut self.registers, registers);
        copy_prefix(&mut self.memory, memory);
    }

    /// Reset, copy `registers`, and fill every memory cell from `f`
    pub fn init_with(&mut self, registers: &[i32], mut f: impl FnMut() -> i32) {
        self.reset();
        copy_prefix(&mut self.registers, registers);
        self.memory.iter_mut().for_each(|cell| *cell = f());
    }

    pub fn registers(&self) -> &[i32] {
        &self.registers
    }

    pub fn memory(&self) -> &[i32] {
        &self.memory
    }

    pub fn reg(&self, index: usize) -> Option<i32> {
        self.registers.get(index).copied()
    }

    /// Bounds-checked memory read
    pub fn mem(&self, addr: i32) -> Result<i32, MemoryFault> {
        let index = self.mem_index(addr)?;
        Ok(self.memory[index])
    }

    /// Bounds-checked memory write access
    pub fn mem_mut(&mut self, addr: i32) -> Result<&mut i32, MemoryFault> {
        let index = self.mem_index(addr)?;
        Ok(&mut self.memory[index])
    }

    fn mem_index(&self, addr: i32) -> Result<usize, MemoryFault> {
        usize::try_from(addr)
            .ok()
            .filter(|&i| i < self.memory.len())
            .ok_or(MemoryFault {
                addr,
                size: self.memory.len(),
            })
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }

    pub fn flag(&self) -> i32 {
        self.flag
    }

    /// Instructions executed since the last reset
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn halt(&self) -> HaltCode {
        self.halt
    }

    pub fn num_registers(&self) -> usize {
        self.registers.len()
    }

    pub fn memory_size(&self) -> usize {
        self.memory.len()
    }

    /// Length of [`MachineState::feature`]
    pub fn feature_dim(&self) -> usize {
        self.memory.len() + self.registers.len() + 2
    }

    /// Memory, then registers, then pc, then flag
    pub fn feature(&self) -> Vec<i32> {
        let mut f = Vec::with_capacity(self.feature_dim());
        f.extend_from_slice(&self.memory);
        f.extend_from_slice(&self.registers);
        f.push(self.pc);
        f.push(self.flag);
        f
    }
}

fn copy_prefix(dst: &mut [i32], src: &[i32]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pc: {}  flag: {}  #code_run: {}  return code: {}",
            self.pc, self.flag, self.counter, self.halt
        )?;
        write!(f, "Register:")?;
        for r in &self.registers {
            write!(f, " {}", r)?;
        }
        writeln!(f)?;
        write!(f, "Memory:")?;
        for m in &self.memory {
            write!(f, " {}", m)?;
        }
        writeln!(f)
    }
}
