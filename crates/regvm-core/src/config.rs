//! Configuration types for the machine, sampler, pruner and generator.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Machine shape and execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of registers
    pub num_registers: usize,
    /// Number of memory cells
    pub memory_size: usize,
    /// Maximum instructions executed per run
    pub max_steps: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            num_registers: 4,
            memory_size: 10,
            max_steps: 1000,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_registers == 0 {
            return Err(Error::Validation("num_registers must be positive".to_string()));
        }
        if self.max_steps == 0 {
            return Err(Error::Validation("max_steps must be positive".to_string()));
        }
        Ok(())
    }

    /// Length of a machine state feature: memory, registers, pc and flag.
    pub fn state_feature_dim(&self) -> usize {
        self.memory_size + self.num_registers + 2
    }
}

/// Random program and memory sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub num_registers: usize,
    /// Number of instructions per sampled program
    pub program_length: usize,
    /// Allow `end`, `rep` and `cmp` in sampled programs
    pub use_loop: bool,
    /// Sampled memory cells lie in `[0, mem_upper_bound]`
    pub mem_upper_bound: i32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_registers: 4,
            program_length: 20,
            use_loop: true,
            mem_upper_bound: 10,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        // Binary operands are drawn distinct, which needs two registers.
        if self.num_registers < 2 {
            return Err(Error::Validation(format!(
                "sampling needs at least 2 registers, got {}",
                self.num_registers
            )));
        }
        if self.mem_upper_bound < 0 {
            return Err(Error::Validation(format!(
                "mem_upper_bound must be non-negative, got {}",
                self.mem_upper_bound
            )));
        }
        Ok(())
    }
}

/// Greedy pruning parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Number of random memories the pruned program must agree on
    pub num_samples: usize,
    /// Pruning memories are drawn from `[0, sample_upper_bound]`
    pub sample_upper_bound: i32,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            sample_upper_bound: 19,
        }
    }
}

impl PruneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_upper_bound < 0 {
            return Err(Error::Validation(format!(
                "sample_upper_bound must be non-negative, got {}",
                self.sample_upper_bound
            )));
        }
        Ok(())
    }
}

/// Episode generation (sample, prune, validate, featurize)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub machine: MachineConfig,
    /// Memories per episode
    pub num_memory_samples: usize,
    /// Length of the sampled program before pruning
    pub initial_program_length: usize,
    /// Accept pruned programs with at least this many instructions
    pub min_program_length: usize,
    /// Accept pruned programs with at most this many instructions
    pub max_program_length: usize,
    /// Episode memory cells lie in `[0, mem_upper_bound]`
    pub mem_upper_bound: i32,
    pub use_loop: bool,
    /// Attempts before generation fails
    pub max_attempts: usize,
    /// Initial registers; defaults to `[memory_size, 0, 0, ...]`
    pub init_registers: Option<Vec<i32>>,
    /// Random seed for reproducibility; entropy when unset
    pub seed: Option<u64>,
    pub prune: PruneConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            machine: MachineConfig::default(),
            num_memory_samples: 10,
            initial_program_length: 20,
            min_program_length: 5,
            max_program_length: 10,
            mem_upper_bound: 10,
            use_loop: true,
            max_attempts: 100,
            init_registers: None,
            seed: None,
            prune: PruneConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        self.machine.validate()?;
        self.prune.validate()?;
        self.sampler_config().validate()?;

        if self.min_program_length > self.max_program_length {
            return Err(Error::Validation(format!(
                "min_program_length {} exceeds max_program_length {}",
                self.min_program_length, self.max_program_length
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Validation("max_attempts must be positive".to_string()));
        }
        if let Some(regs) = &self.init_registers {
            if regs.len() != self.machine.num_registers {
                return Err(Error::Validation(format!(
                    "init_registers has {} values for {} registers",
                    regs.len(),
                    self.machine.num_registers
                )));
            }
        }
        Ok(())
    }

    /// Initial register vector: explicit, or the memory size in r0 and zeros elsewhere.
    pub fn initial_registers(&self) -> Vec<i32> {
        match &self.init_registers {
            Some(regs) => regs.clone(),
            None => {
                let mut regs = vec![0; self.machine.num_registers];
                if let Some(first) = regs.first_mut() {
                    *first = self.machine.memory_size as i32;
                }
                regs
            }
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            num_registers: self.machine.num_registers,
            program_length: self.initial_program_length,
            use_loop: self.use_loop,
            mem_upper_bound: self.mem_upper_bound,
        }
    }

    /// Width of one memory sample's state feature.
    pub fn ensemble_state_dim(&self) -> usize {
        self.machine.state_feature_dim()
    }
}
