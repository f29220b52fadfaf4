//! Greedy, semantics-preserving program pruning.
//!
//! A program is reduced one instruction at a time. A deletion is kept only
//! if the shorter program still ends on every sample memory and leaves
//! exactly the memory the original left. After each kept deletion the scan
//! restarts from the first instruction, so the result is a local fixed
//! point: no single further deletion preserves the observed behavior.

use rand_chacha::ChaCha8Rng;
use regvm_core::{Error, HaltCode, MachineConfig, Memory, PruneConfig, Result};
use regvm_ir::{sample_memory, Instruction};
use regvm_runtime::Machine;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

/// The first sample on which a program did not end normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFailure {
    pub sample: usize,
    pub halt: HaltCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrunedProgram {
    pub instructions: Vec<Instruction>,
    /// Memories the program was checked against
    pub samples: Vec<Memory>,
    /// Memory left by the original program on each sample
    pub expected: Vec<Memory>,
    /// Instructions removed from the original
    pub removed: usize,
    /// Machine runs spent, including the reference runs
    pub machine_runs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PruneOutcome {
    Pruned(PrunedProgram),
    /// The original program does not end on some sample; nothing was pruned.
    Rejected(SampleFailure),
}

impl PruneOutcome {
    pub fn pruned(self) -> Option<PrunedProgram> {
        match self {
            PruneOutcome::Pruned(p) => Some(p),
            PruneOutcome::Rejected(_) => None,
        }
    }
}

/// Run the loaded program on every sample and collect the final memories.
///
/// Stops at the first sample that does not end with [`HaltCode::Ended`].
pub fn apply_to_memories(
    machine: &mut Machine,
    init_registers: &[i32],
    samples: &[Memory],
) -> std::result::Result<Vec<Memory>, SampleFailure> {
    let mut after = Vec::with_capacity(samples.len());
    for (sample, memory) in samples.iter().enumerate() {
        machine.state_mut().init(init_registers, memory);
        let halt = machine.run();
        if halt != HaltCode::Ended {
            return Err(SampleFailure { sample, halt });
        }
        after.push(machine.state().memory().to_vec());
    }
    Ok(after)
}

pub struct GreedyPruner {
    machine: MachineConfig,
    config: PruneConfig,
}

impl GreedyPruner {
    pub fn new(machine: MachineConfig, config: PruneConfig) -> Self {
        Self { machine, config }
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    /// Draw `num_samples` random memories and prune against them
    pub fn prune(
        &self,
        instructions: &[Instruction],
        init_registers: &[i32],
        rng: &mut ChaCha8Rng,
    ) -> Result<PruneOutcome> {
        let samples: Vec<Memory> = (0..self.config.num_samples)
            .map(|_| sample_memory(rng, self.machine.memory_size, self.config.sample_upper_bound))
            .collect();
        self.prune_with_samples(instructions, init_registers, samples)
    }

    /// Prune against caller-supplied sample memories.
    ///
    /// Fails if `init_registers` does not match the register count or the
    /// original program does not link. Candidates that fault or exhaust the
    /// step budget are simply not accepted.
    #[instrument(skip_all, fields(len = instructions.len(), samples = samples.len()))]
    pub fn prune_with_samples(
        &self,
        instructions: &[Instruction],
        init_registers: &[i32],
        samples: Vec<Memory>,
    ) -> Result<PruneOutcome> {
        if init_registers.len() != self.machine.num_registers {
            return Err(Error::Validation(format!(
                "{} initial registers given for {} registers",
                init_registers.len(),
                self.machine.num_registers
            )));
        }
        let mut machine = Machine::new(&self.machine);
        machine.load(instructions)?;

        let expected = match apply_to_memories(&mut machine, init_registers, &samples) {
            Ok(expected) => expected,
            Err(failure) => {
                trace!(sample = failure.sample, halt = %failure.halt, "Original program rejected");
                return Ok(PruneOutcome::Rejected(failure));
            }
        };
        let mut machine_runs = samples.len();

        let mut current = instructions.to_vec();
        'search: loop {
            for i in 0..current.len() {
                let mut candidate = current.clone();
                candidate.remove(i);
                // Every block boundary after `i` may move, so relink from scratch.
                if machine.load(&candidate).is_err() {
                    continue;
                }

                let (preserved, runs) =
                    preserves_behavior(&mut machine, init_registers, &samples, &expected);
                machine_runs += runs;
                if preserved {
                    trace!(index = i, removed = %current[i], "Deletion accepted");
                    current = candidate;
                    continue 'search;
                }
            }
            break;
        }

        debug!(
            original_len = instructions.len(),
            pruned_len = current.len(),
            machine_runs,
            "Pruned program"
        );

        Ok(PruneOutcome::Pruned(PrunedProgram {
            removed: instructions.len() - current.len(),
            instructions: current,
            samples,
            expected,
            machine_runs,
        }))
    }
}

/// Whether the loaded program reproduces `expected` on every sample; also
/// returns the number of runs spent before deciding.
fn preserves_behavior(
    machine: &mut Machine,
    init_registers: &[i32],
    samples: &[Memory],
    expected: &[Memory],
) -> (bool, usize) {
    for (j, (memory, want)) in samples.iter().zip(expected).enumerate() {
        machine.state_mut().init(init_registers, memory);
        let halt = machine.run();
        if halt != HaltCode::Ended || machine.state().memory() != want.as_slice() {
            return (false, j + 1);
        }
    }
    (true, samples.len())
}
