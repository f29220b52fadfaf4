//! Single-instruction semantics.

use crate::state::{MachineState, MemoryFault};
use regvm_ir::{BlockMap, Instruction, Opcode};

/// Execute `inst`, located at `pc`, against `state`.
///
/// Jumps write `state.pc` so that the caller's unconditional `pc += 1` lands
/// on the intended instruction. Register operands must have been checked by
/// the linker. On a fault, effects of earlier instructions are kept.
pub fn step(
    inst: &Instruction,
    pc: usize,
    state: &mut MachineState,
    blocks: &BlockMap,
) -> Result<(), MemoryFault> {
    let a = inst.arg1 as usize;
    let b = inst.arg2 as usize;

    match inst.opcode {
        Opcode::Rep => {
            if state.registers[a] > 0 {
                state.registers[a] -= 1;
            } else if let Some(end) = blocks.target(pc) {
                // Skip the body: land on the matching end, then past it.
                state.pc = end as i32;
            }
        }
        Opcode::End => {
            // Loop ends jump back to their header; conditional ends and
            // padding fall through.
            if let Some(start) = blocks.target(pc) {
                state.pc = start as i32 - 1;
            }
        }
        Opcode::Cmp => {
            if state.registers[a] >= state.registers[b] {
                if let Some(end) = blocks.target(pc) {
                    state.pc = end as i32 - 1;
                }
            }
        }
        Opcode::Mov => {
            state.registers[a] = state.registers[b];
        }
        Opcode::Inc => {
            state.registers[a] = state.registers[a].wrapping_add(1);
        }
        Opcode::Dec => {
            state.registers[a] = state.registers[a].wrapping_sub(1);
        }
        Opcode::Load => {
            let addr = state.registers[b];
            state.registers[a] = state.mem(addr)?;
        }
        Opcode::Save => {
            let value = state.registers[a];
            let addr = state.registers[b];
            *state.mem_mut(addr)? = value;
        }
    }

    Ok(())
}
