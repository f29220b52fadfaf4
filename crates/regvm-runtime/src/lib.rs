//! Interpreter for linked register-machine programs.
//!
//! This module provides:
//! - Machine state with bounds-checked memory
//! - A central step dispatcher over tagged instructions
//! - A step-budgeted run loop with optional execution traces

pub mod machine;
pub mod state;
pub mod step;
pub mod trace;

pub use machine::Machine;
pub use state::{MachineState, MemoryFault};
pub use step::step;
pub use trace::{Trace, TraceStep};

use regvm_core::{HaltCode, Memory, Registers};
use regvm_ir::Program;
use serde::{Deserialize, Serialize};

/// Options for a single [`run`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum instructions executed
    pub max_steps: usize,
    /// Record a snapshot before every instruction
    pub record_trace: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            record_trace: false,
        }
    }
}

/// Result of a single [`run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub halt: HaltCode,
    pub memory: Memory,
    pub registers: Registers,
    /// Instructions executed
    pub steps: usize,
    pub trace: Option<Trace>,
}

/// Run `program` once on the given registers and memory.
///
/// The memory capacity is `memory.len()`. Faults and step exhaustion are
/// reported through [`RunOutcome::halt`], never as errors.
pub fn run(program: &Program, registers: &[i32], memory: &[i32], options: &RunOptions) -> RunOutcome {
    let mut machine = Machine::with_program(program.clone(), memory.len(), options.max_steps);
    machine.set_record_trace(options.record_trace);
    machine.state_mut().init(registers, memory);

    let halt = machine.run();
    let trace = options.record_trace.then(|| machine.take_trace());
    let state = machine.state();

    RunOutcome {
        halt,
        memory: state.memory().to_vec(),
        registers: state.registers().to_vec(),
        steps: state.counter(),
        trace,
    }
}
