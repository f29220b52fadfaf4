//! Instruction set, textual forms, linker and sampler for the register machine.
//!
//! Programs are flat instruction lists. Control flow is expressed with
//! `rep ... end` loops and `cmp ... end` conditionals, which the linker
//! resolves into a jump table before execution.

pub mod instruction;
pub mod program;
pub mod sampler;
pub mod text;
pub mod validation;

pub use instruction::{Arity, Instruction, Opcode, INSTRUCTION_DIM};
pub use program::{Block, BlockKind, BlockMap, Program};
pub use sampler::{enumerate_instructions, sample_memory, Sampler};
pub use text::{load_listing, parse_listing, parse_program, render_listing, render_program};
pub use validation::validate_registers;
