//! The execution engine.

use crate::state::MachineState;
use crate::step::step;
use crate::trace::Trace;
use regvm_core::{Error, HaltCode, MachineConfig, Result};
use regvm_ir::{Instruction, Program};

/// A machine owning its state and the program it runs
pub struct Machine {
    state: MachineState,
    program: Program,
    max_steps: usize,
    record_trace: bool,
    trace: Trace,
}

impl Machine {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            state: MachineState::new(config.num_registers, config.memory_size),
            program: Program::empty(config.num_registers),
            max_steps: config.max_steps,
            record_trace: false,
            trace: Trace::new(),
        }
    }

    /// Build a machine around an already linked program
    pub fn with_program(program: Program, memory_size: usize, max_steps: usize) -> Self {
        Self {
            state: MachineState::new(program.num_registers(), memory_size),
            program,
            max_steps,
            record_trace: false,
            trace: Trace::new(),
        }
    }

    /// Link `instructions` against this machine's register file and load them
    pub fn load(&mut self, instructions: &[Instruction]) -> Result<()> {
        self.program = Program::link(instructions, self.state.num_registers())?;
        Ok(())
    }

    /// Load a linked program; its register count must match the machine's
    pub fn load_program(&mut self, program: Program) -> Result<()> {
        if program.num_registers() != self.state.num_registers() {
            return Err(Error::Validation(format!(
                "program linked for {} registers, machine has {}",
                program.num_registers(),
                self.state.num_registers()
            )));
        }
        self.program = program;
        Ok(())
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn set_record_trace(&mut self, record: bool) {
        self.record_trace = record;
    }

    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Trace of the last run; empty unless recording is enabled
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Trace {
        std::mem::take(&mut self.trace)
    }

    fn pc_in_range(&self) -> bool {
        self.state.pc >= 0 && (self.state.pc as usize) < self.program.len()
    }

    /// Run the loaded program from the current state until it halts.
    ///
    /// A state that already halted is left untouched; `init` it first.
    pub fn run(&mut self) -> HaltCode {
        if self.state.halt.is_terminal() {
            return self.state.halt;
        }
        if self.record_trace {
            self.trace.clear();
        }

        while self.pc_in_range() && self.state.counter < self.max_steps {
            if self.record_trace {
                self.trace.push(&self.state);
            }

            let pc = self.state.pc as usize;
            let inst = self.program.instructions()[pc];
            if let Err(fault) = step(&inst, pc, &mut self.state, self.program.block_map()) {
                tracing::trace!(pc, instruction = %inst, %fault, "Memory fault");
                self.state.halt = HaltCode::MemOob;
                break;
            }

            self.state.pc += 1;
            self.state.counter += 1;
        }

        if self.state.halt == HaltCode::Running {
            if self.pc_in_range() {
                self.state.halt = HaltCode::MaxStepsReached;
            } else {
                self.state.halt = HaltCode::Ended;
                if self.record_trace {
                    self.trace.push(&self.state);
                }
            }
        }

        tracing::trace!(
            halt = %self.state.halt,
            steps = self.state.counter,
            "Run finished"
        );
        self.state.halt
    }
}
