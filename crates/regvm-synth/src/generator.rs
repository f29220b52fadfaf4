//! Episode generation: sample, prune, validate, featurize.

use crate::pruner::{GreedyPruner, PruneOutcome};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regvm_core::{Error, GeneratorConfig, HaltCode, Memory, Result};
use regvm_ir::{parse_program, render_program, Instruction, Program, Sampler, INSTRUCTION_DIM};
use regvm_runtime::{Machine, MachineState, Trace};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

/// Programs sampled and pruned within one attempt before it is given up.
const SAMPLES_PER_ATTEMPT: usize = 1000;

/// A validated program together with its execution on fresh memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub program: Vec<Instruction>,
    /// Initial memory of each sample
    pub memories: Vec<Memory>,
    /// One trace per sample, each ending with the final state
    pub traces: Vec<Trace>,
    /// First-snapshot features of every sample, concatenated
    pub mem_in: Vec<i32>,
    /// Last-snapshot features of every sample, concatenated
    pub mem_out: Vec<i32>,
    /// Instruction features, zero padded to the maximum program length
    pub code: Vec<i32>,
    /// Attempts used, starting at 1
    pub attempts: usize,
}

impl Episode {
    pub fn num_samples(&self) -> usize {
        self.traces.len()
    }

    /// Feature of the snapshot at trace position `step` of `sample`
    pub fn state_feature(&self, sample: usize, step: usize) -> Option<Vec<i32>> {
        self.traces.get(sample)?.feature(step)
    }

    /// States of `sample` observed each time instruction `pc` was about to run
    pub fn states_at_instruction(&self, sample: usize, pc: i32) -> Vec<&MachineState> {
        self.traces
            .get(sample)
            .map(|t| t.states_at(pc).collect())
            .unwrap_or_default()
    }
}

pub struct Generator {
    config: GeneratorConfig,
    sampler: Sampler,
    pruner: GreedyPruner,
    machine: Machine,
    init_registers: Vec<i32>,
    rng: ChaCha8Rng,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut machine = Machine::new(&config.machine);
        machine.set_record_trace(true);

        Ok(Self {
            sampler: Sampler::new(config.sampler_config())?,
            pruner: GreedyPruner::new(config.machine.clone(), config.prune.clone()),
            init_registers: config.initial_registers(),
            machine,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Width of one sample's state feature
    pub fn ensemble_state_dim(&self) -> usize {
        self.config.ensemble_state_dim()
    }

    /// Produce one episode, from `program_text` if given, otherwise from a
    /// freshly sampled and pruned program.
    #[instrument(skip(self, program_text), fields(supplied = program_text.is_some()))]
    pub fn generate(&mut self, program_text: Option<&str>) -> Result<Episode> {
        let supplied = program_text.map(|text| self.parse_supplied(text)).transpose()?;

        for attempt in 1..=self.config.max_attempts {
            let program = match &supplied {
                Some(program) => program.clone(),
                None => match self.sample_pruned()? {
                    Some(program) => program,
                    None => {
                        debug!(attempt, "No pruned program in length range");
                        continue;
                    }
                },
            };

            let memories: Vec<Memory> = (0..self.config.num_memory_samples)
                .map(|_| self.sampler.sample_memory(&mut self.rng, self.config.machine.memory_size))
                .collect();

            match self.record(&program, &memories)? {
                Some(traces) => {
                    info!(
                        attempt,
                        len = program.len(),
                        program = %render_program(&program),
                        "Generated episode"
                    );
                    return Ok(self.featurize(program, memories, traces, attempt));
                }
                None => debug!(attempt, "Program did not end on every memory"),
            }
        }

        Err(Error::Exhausted {
            attempts: self.config.max_attempts,
            reason: "no program ended on every sampled memory".to_string(),
        })
    }

    fn parse_supplied(&self, text: &str) -> Result<Vec<Instruction>> {
        let program = parse_program(text)?;
        Program::link(&program, self.config.machine.num_registers)?;
        if program.len() > self.config.max_program_length {
            return Err(Error::Validation(format!(
                "program has {} instructions, at most {} allowed",
                program.len(),
                self.config.max_program_length
            )));
        }
        Ok(program)
    }

    /// Sample and prune until the result has an acceptable length.
    fn sample_pruned(&mut self) -> Result<Option<Vec<Instruction>>> {
        let range = self.config.min_program_length..=self.config.max_program_length;

        for _ in 0..SAMPLES_PER_ATTEMPT {
            let code = self.sampler.sample_program(&mut self.rng);
            let outcome = self.pruner.prune(&code, &self.init_registers, &mut self.rng)?;
            match outcome {
                PruneOutcome::Pruned(pruned) if range.contains(&pruned.instructions.len()) => {
                    return Ok(Some(pruned.instructions));
                }
                PruneOutcome::Pruned(pruned) => {
                    trace!(len = pruned.instructions.len(), "Pruned length out of range");
                }
                PruneOutcome::Rejected(failure) => {
                    trace!(sample = failure.sample, halt = %failure.halt, "Sampled program rejected");
                }
            }
        }
        Ok(None)
    }

    /// Run `program` on every memory with tracing; `None` if any run does not end.
    fn record(&mut self, program: &[Instruction], memories: &[Memory]) -> Result<Option<Vec<Trace>>> {
        self.machine.load(program)?;

        let mut traces = Vec::with_capacity(memories.len());
        for memory in memories {
            self.machine.state_mut().init(&self.init_registers, memory);
            if self.machine.run() != HaltCode::Ended {
                return Ok(None);
            }
            traces.push(self.machine.take_trace());
        }
        Ok(Some(traces))
    }

    fn featurize(
        &self,
        program: Vec<Instruction>,
        memories: Vec<Memory>,
        traces: Vec<Trace>,
        attempts: usize,
    ) -> Episode {
        let dim = self.ensemble_state_dim();
        let mut mem_in = Vec::with_capacity(dim * traces.len());
        let mut mem_out = Vec::with_capacity(dim * traces.len());
        for t in &traces {
            if let (Some(first), Some(last)) = (t.first(), t.last()) {
                mem_in.extend(first.feature());
                mem_out.extend(last.feature());
            }
        }

        let mut code: Vec<i32> = program.iter().flat_map(Instruction::feature).collect();
        code.resize(self.config.max_program_length * INSTRUCTION_DIM, 0);

        Episode {
            program,
            memories,
            traces,
            mem_in,
            mem_out,
            code,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regvm_core::MachineConfig;

    fn seeded(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_supplied_program_episode() {
        let mut gen = Generator::new(seeded(1)).unwrap();
        let episode = gen.generate(Some("load 2 1; inc 2; save 2 1")).unwrap();

        assert_eq!(episode.attempts, 1);
        assert_eq!(episode.num_samples(), 10);
        assert_eq!(episode.program.len(), 3);
        assert_eq!(episode.mem_in.len(), 16 * 10);
        assert_eq!(episode.mem_out.len(), 16 * 10);
        assert_eq!(episode.code.len(), 10 * 3);
        assert_eq!(&episode.code[..9], &[6, 2, 1, 2, 2, -1, 7, 2, 1]);
        assert!(episode.code[9..].iter().all(|&v| v == 0));

        for (i, memory) in episode.memories.iter().enumerate() {
            assert!(memory.iter().all(|v| (0..=10).contains(v)));
            let first = &episode.mem_in[i * 16..(i + 1) * 16];
            let last = &episode.mem_out[i * 16..(i + 1) * 16];
            assert_eq!(&first[..10], memory.as_slice());
            // r1 starts at 0, so mem[0] gains one.
            assert_eq!(last[0], memory[0] + 1);
            assert_eq!(&last[1..10], &memory[1..]);
            // pc 3, flag 0
            assert_eq!(&last[14..], &[3, 0]);
        }
    }

    #[test]
    fn test_state_accessors() {
        let mut gen = Generator::new(seeded(2)).unwrap();
        let episode = gen.generate(Some("rep 2; inc 3; end")).unwrap();

        // r2 starts at 0: header, then straight out.
        assert_eq!(episode.traces[0].len(), 2);
        assert_eq!(episode.states_at_instruction(0, 0).len(), 1);
        assert!(episode.states_at_instruction(0, 1).is_empty());
        assert!(episode.states_at_instruction(42, 0).is_empty());
        assert_eq!(
            episode.state_feature(0, 0).as_deref(),
            Some(&episode.mem_in[..16])
        );
        assert!(episode.state_feature(0, 9).is_none());

        let json = serde_json::to_value(&episode).unwrap();
        assert_eq!(json["attempts"], 1);
        assert_eq!(json["code"].as_array().map(Vec::len), Some(30));
    }

    #[test]
    fn test_supplied_program_that_faults_exhausts() {
        // r0 is the memory size, one past the last cell.
        let mut gen = Generator::new(GeneratorConfig {
            max_attempts: 3,
            ..seeded(3)
        })
        .unwrap();
        match gen.generate(Some("load 1 0")) {
            Err(Error::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other.map(|e| e.program)),
        }
    }

    #[test]
    fn test_supplied_program_errors_are_fatal() {
        let mut gen = Generator::new(seeded(4)).unwrap();
        assert!(matches!(gen.generate(Some("jmp 1")), Err(Error::Parse { .. })));
        assert!(matches!(gen.generate(Some("inc 4")), Err(Error::Structural { .. })));
        assert!(matches!(
            gen.generate(Some("inc 0; inc 0; inc 0; inc 0; inc 0; inc 0; inc 0; inc 0; inc 0; inc 0; inc 0")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GeneratorConfig {
            min_program_length: 8,
            max_program_length: 4,
            ..Default::default()
        };
        assert!(Generator::new(config).is_err());
    }

    #[test]
    fn test_sampled_episode_within_length_bounds() {
        let mut gen = Generator::new(seeded(5)).unwrap();
        let episode = gen.generate(None).unwrap();
        assert!((5..=10).contains(&episode.program.len()));
        assert!(episode.attempts >= 1 && episode.attempts <= 100);

        for t in &episode.traces {
            assert_eq!(t.last().map(MachineState::halt), Some(HaltCode::Ended));
        }
    }

    #[test]
    fn test_same_seed_same_episode() {
        let a = Generator::new(seeded(6)).unwrap().generate(None).unwrap();
        let b = Generator::new(seeded(6)).unwrap().generate(None).unwrap();
        assert_eq!(a.program, b.program);
        assert_eq!(a.memories, b.memories);
        assert_eq!(a.mem_out, b.mem_out);
    }

    #[test]
    fn test_custom_machine_dimensions() {
        let config = GeneratorConfig {
            machine: MachineConfig {
                num_registers: 3,
                memory_size: 4,
                ..Default::default()
            },
            num_memory_samples: 2,
            ..seeded(7)
        };
        let mut gen = Generator::new(config).unwrap();
        assert_eq!(gen.ensemble_state_dim(), 9);
        let episode = gen.generate(Some("mov 1 0; dec 1; save 1 1")).unwrap();
        assert_eq!(episode.mem_in.len(), 18);
        for (i, memory) in episode.memories.iter().enumerate() {
            let last = &episode.mem_out[i * 9..(i + 1) * 9];
            // r1 = memory size - 1, stored at its own address
            assert_eq!(&last[..3], &memory[..3]);
            assert_eq!(last[3], 3);
        }
    }
}
