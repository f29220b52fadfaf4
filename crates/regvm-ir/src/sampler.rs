//! Random programs and memories.

use crate::instruction::{Arity, Instruction, Opcode};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use regvm_core::{Memory, Result, SamplerConfig};

/// Draws syntactically valid programs and test memories from a caller-owned RNG.
pub struct Sampler {
    config: SamplerConfig,
    opcodes: Vec<Opcode>,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;

        let opcodes = Opcode::ALL
            .iter()
            .copied()
            .filter(|op| config.use_loop || !op.is_loop_construct())
            .collect();

        Ok(Self { config, opcodes })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample a program of exactly `program_length` instructions
    pub fn sample_program(&self, rng: &mut ChaCha8Rng) -> Vec<Instruction> {
        let mut code: Vec<Instruction> = Vec::with_capacity(self.config.program_length);

        while code.len() < self.config.program_length {
            let inst = self.sample_instruction(rng);

            // Back-to-back copies of these only waste program length.
            if inst.opcode.is_idempotent() && code.last() == Some(&inst) {
                continue;
            }

            code.push(inst);
        }

        tracing::trace!(len = code.len(), use_loop = self.config.use_loop, "Sampled program");
        code
    }

    /// Sample a single instruction; binary operands are always distinct
    pub fn sample_instruction(&self, rng: &mut ChaCha8Rng) -> Instruction {
        let opcode = self.opcodes[rng.gen_range(0..self.opcodes.len())];
        let num_reg = self.config.num_registers as i32;

        match opcode.arity() {
            Arity::Nullary => Instruction::new(opcode, Instruction::NO_ARG, Instruction::NO_ARG),
            Arity::Unary => Instruction::unary(opcode, rng.gen_range(0..num_reg)),
            Arity::Binary => loop {
                let a = rng.gen_range(0..num_reg);
                let b = rng.gen_range(0..num_reg);
                if a != b {
                    break Instruction::binary(opcode, a, b);
                }
            },
        }
    }

    /// Sample `size` memory cells uniformly from `[0, mem_upper_bound]`
    pub fn sample_memory(&self, rng: &mut ChaCha8Rng, size: usize) -> Memory {
        sample_memory(rng, size, self.config.mem_upper_bound)
    }
}

/// Sample `size` memory cells uniformly from `[0, upper_bound]`
pub fn sample_memory(rng: &mut ChaCha8Rng, size: usize, upper_bound: i32) -> Memory {
    (0..size).map(|_| rng.gen_range(0..=upper_bound)).collect()
}

/// Every instruction the sampler can produce for `num_registers` registers
pub fn enumerate_instructions(num_registers: usize) -> Vec<Instruction> {
    let num_reg = num_registers as i32;
    let mut instructions = Vec::new();

    for opcode in Opcode::ALL {
        match opcode.arity() {
            Arity::Nullary => instructions.push(Instruction::end()),
            Arity::Unary => {
                instructions.extend((0..num_reg).map(|r| Instruction::unary(opcode, r)));
            }
            Arity::Binary => {
                for a in 0..num_reg {
                    for b in (0..num_reg).filter(|&b| b != a) {
                        instructions.push(Instruction::binary(opcode, a, b));
                    }
                }
            }
        }
    }

    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sampler(use_loop: bool) -> Sampler {
        Sampler::new(SamplerConfig {
            use_loop,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_program_has_requested_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let program = sampler(true).sample_program(&mut rng);
        assert_eq!(program.len(), 20);
    }

    #[test]
    fn test_binary_operands_distinct_and_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sampler = sampler(true);
        for _ in 0..50 {
            for inst in sampler.sample_program(&mut rng) {
                match inst.opcode.arity() {
                    Arity::Nullary => {
                        assert_eq!(inst.arg1, -1);
                        assert_eq!(inst.arg2, -1);
                    }
                    Arity::Unary => {
                        assert!((0..4).contains(&inst.arg1));
                        assert_eq!(inst.arg2, -1);
                    }
                    Arity::Binary => {
                        assert!((0..4).contains(&inst.arg1));
                        assert!((0..4).contains(&inst.arg2));
                        assert_ne!(inst.arg1, inst.arg2);
                    }
                }
            }
        }
    }

    #[test]
    fn test_loop_free_mode_excludes_blocks() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sampler = sampler(false);
        for _ in 0..50 {
            let program = sampler.sample_program(&mut rng);
            assert!(program.iter().all(|inst| !inst.opcode.is_loop_construct()));
        }
    }

    #[test]
    fn test_no_back_to_back_idempotent_repeats() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let sampler = Sampler::new(SamplerConfig {
            num_registers: 2,
            program_length: 200,
            ..Default::default()
        })
        .unwrap();
        let program = sampler.sample_program(&mut rng);
        for pair in program.windows(2) {
            if pair[1].opcode.is_idempotent() {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_same_seed_same_program() {
        let sampler = sampler(true);
        let a = sampler.sample_program(&mut ChaCha8Rng::seed_from_u64(99));
        let b = sampler.sample_program(&mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_memory_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let memory = sampler(true).sample_memory(&mut rng, 1000);
        assert_eq!(memory.len(), 1000);
        assert!(memory.iter().all(|v| (0..=10).contains(v)));
        assert!(memory.contains(&0));
        assert!(memory.contains(&10));
    }

    #[test]
    fn test_sampler_rejects_single_register() {
        let result = Sampler::new(SamplerConfig {
            num_registers: 1,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_enumerate_instructions() {
        let all = enumerate_instructions(4);
        // end + 3 unary * 4 + 4 binary * 4 * 3
        assert_eq!(all.len(), 1 + 12 + 48);
        assert_eq!(all[0], Instruction::end());
        assert!(all.contains(&Instruction::save(3, 2)));
        assert!(!all.contains(&Instruction::mov(1, 1)));

        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
