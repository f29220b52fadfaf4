//! Subcommand implementations. Each returns the text printed on stdout.

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regvm_core::{GeneratorConfig, MachineConfig, PruneConfig};
use regvm_ir::{
    enumerate_instructions, load_listing, parse_program, render_listing, Instruction, Program,
};
use regvm_runtime::{run, RunOptions};
use regvm_synth::{Generator, GreedyPruner, PruneOutcome};
use std::path::PathBuf;
use tracing::info;

/// Where a program comes from: a listing file or inline `;`-separated code
#[derive(Args, Debug, Clone)]
pub struct ProgramSource {
    /// Listing file, one instruction per line
    pub file: Option<PathBuf>,

    /// Inline program, e.g. "rep 0; inc 1; end"
    #[arg(long, conflicts_with = "file")]
    pub code: Option<String>,
}

impl ProgramSource {
    pub fn load(&self) -> Result<Vec<Instruction>> {
        match (&self.file, &self.code) {
            (_, Some(code)) => Ok(parse_program(code)?),
            (Some(path), None) => {
                load_listing(path).with_context(|| format!("reading {}", path.display()))
            }
            (None, None) => bail!("either a listing file or --code is required"),
        }
    }
}

/// Machine dimensions shared by commands that execute programs
#[derive(Args, Debug, Clone)]
pub struct MachineArgs {
    #[arg(long, default_value_t = 4)]
    pub num_registers: usize,

    #[arg(long, default_value_t = 10)]
    pub memory_size: usize,

    #[arg(long, default_value_t = 1000)]
    pub max_steps: usize,
}

impl Default for MachineArgs {
    fn default() -> Self {
        let config = MachineConfig::default();
        Self {
            num_registers: config.num_registers,
            memory_size: config.memory_size,
            max_steps: config.max_steps,
        }
    }
}

impl MachineArgs {
    pub fn config(&self) -> Result<MachineConfig> {
        let config = MachineConfig {
            num_registers: self.num_registers,
            memory_size: self.memory_size,
            max_steps: self.max_steps,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Registers given on the command line, zero padded to the register count;
/// the default is the memory size in r0 and zeros elsewhere.
fn initial_registers(given: &[i32], machine: &MachineConfig) -> Result<Vec<i32>> {
    if given.is_empty() {
        return Ok(GeneratorConfig {
            machine: machine.clone(),
            ..Default::default()
        }
        .initial_registers());
    }
    if given.len() > machine.num_registers {
        bail!(
            "{} register values given for {} registers",
            given.len(),
            machine.num_registers
        );
    }
    let mut registers = given.to_vec();
    registers.resize(machine.num_registers, 0);
    Ok(registers)
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ProgramSource,

    #[command(flatten)]
    pub machine: MachineArgs,

    /// Initial registers; defaults to the memory size in r0 and zeros elsewhere
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub registers: Vec<i32>,

    /// Initial memory prefix; remaining cells are zero
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub memory: Vec<i32>,

    /// Include the execution trace in the output
    #[arg(long)]
    pub trace: bool,
}

pub fn run_program(args: &RunArgs) -> Result<String> {
    let machine = args.machine.config()?;

    let program = Program::link(&args.source.load()?, machine.num_registers)?;
    let registers = initial_registers(&args.registers, &machine)?;
    if args.memory.len() > machine.memory_size {
        bail!(
            "{} memory values given for {} cells",
            args.memory.len(),
            machine.memory_size
        );
    }
    let mut memory = args.memory.clone();
    memory.resize(machine.memory_size, 0);

    let outcome = run(
        &program,
        &registers,
        &memory,
        &RunOptions {
            max_steps: machine.max_steps,
            record_trace: args.trace,
        },
    );
    info!(halt = %outcome.halt, steps = outcome.steps, "Run finished");
    Ok(serde_json::to_string_pretty(&outcome)?)
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    #[command(flatten)]
    pub source: ProgramSource,

    #[command(flatten)]
    pub machine: MachineArgs,

    /// Initial registers; defaults to the memory size in r0 and zeros elsewhere
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub registers: Vec<i32>,

    /// Random memories the program is checked against
    #[arg(long, default_value_t = 10)]
    pub samples: usize,

    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn prune_program(args: &PruneArgs) -> Result<String> {
    let machine = args.machine.config()?;
    let config = PruneConfig {
        num_samples: args.samples,
        ..Default::default()
    };
    config.validate()?;

    let code = args.source.load()?;
    let registers = initial_registers(&args.registers, &machine)?;
    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    match GreedyPruner::new(machine, config).prune(&code, &registers, &mut rng)? {
        PruneOutcome::Pruned(pruned) => {
            info!(
                removed = pruned.removed,
                machine_runs = pruned.machine_runs,
                "Pruned"
            );
            Ok(render_listing(&pruned.instructions))
        }
        PruneOutcome::Rejected(failure) => bail!(
            "program halts with {} on sample {}; nothing to prune",
            failure.halt,
            failure.sample
        ),
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Use this program instead of sampling one
    #[arg(long)]
    pub code: Option<String>,

    /// JSON generator configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Sample straight-line programs only
    #[arg(long)]
    pub no_loop: bool,

    #[arg(long)]
    pub max_attempts: Option<usize>,
}

pub fn generate_episode(args: &GenerateArgs) -> Result<String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<GeneratorConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => GeneratorConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_loop {
        config.use_loop = false;
    }
    if let Some(attempts) = args.max_attempts {
        config.max_attempts = attempts;
    }

    let episode = Generator::new(config)?.generate(args.code.as_deref())?;
    Ok(serde_json::to_string_pretty(&episode)?)
}

#[derive(Args, Debug)]
pub struct EnumerateArgs {
    #[arg(long, default_value_t = 4)]
    pub num_registers: usize,
}

pub fn enumerate(args: &EnumerateArgs) -> Result<String> {
    Ok(render_listing(&enumerate_instructions(args.num_registers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regvm_runtime::RunOutcome;
    use regvm_synth::Episode;
    use std::io::Write;

    fn inline(code: &str) -> ProgramSource {
        ProgramSource {
            file: None,
            code: Some(code.to_string()),
        }
    }

    fn run_args(code: &str) -> RunArgs {
        RunArgs {
            source: inline(code),
            machine: MachineArgs::default(),
            registers: vec![],
            memory: vec![],
            trace: false,
        }
    }

    #[test]
    fn test_run_inline_program() {
        let args = RunArgs {
            memory: vec![4, 5],
            ..run_args("load 2 1; inc 2; save 2 1")
        };
        let outcome: RunOutcome = serde_json::from_str(&run_program(&args).unwrap()).unwrap();
        assert_eq!(outcome.memory, vec![5, 5, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(outcome.registers, vec![10, 0, 5, 0]);
        assert!(outcome.trace.is_none());
    }

    #[test]
    fn test_run_with_trace_from_listing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# count down r0").unwrap();
        writeln!(file, "rep 0").unwrap();
        writeln!(file, "inc 1").unwrap();
        writeln!(file, "end").unwrap();

        let args = RunArgs {
            source: ProgramSource {
                file: Some(file.path().to_path_buf()),
                code: None,
            },
            registers: vec![2],
            trace: true,
            ..run_args("")
        };
        let outcome: RunOutcome = serde_json::from_str(&run_program(&args).unwrap()).unwrap();
        assert_eq!(outcome.registers, vec![0, 2, 0, 0]);
        assert_eq!(outcome.trace.unwrap().len(), outcome.steps + 1);
    }

    #[test]
    fn test_run_rejects_oversized_inputs() {
        let args = RunArgs {
            registers: vec![0; 5],
            ..run_args("inc 0")
        };
        assert!(run_program(&args).is_err());

        let args = RunArgs {
            memory: vec![0; 11],
            ..run_args("inc 0")
        };
        assert!(run_program(&args).is_err());
    }

    #[test]
    fn test_missing_source() {
        let source = ProgramSource {
            file: None,
            code: None,
        };
        assert!(source.load().is_err());
    }

    fn prune_args(code: &str) -> PruneArgs {
        PruneArgs {
            source: inline(code),
            machine: MachineArgs::default(),
            registers: vec![],
            samples: 10,
            seed: Some(3),
        }
    }

    #[test]
    fn test_prune_removes_dead_code() {
        assert_eq!(
            prune_program(&prune_args("inc 3; save 0 1; dec 2")).unwrap(),
            "save 0 1\n"
        );
    }

    #[test]
    fn test_prune_reports_rejection() {
        let err = prune_program(&prune_args("load 1 0")).unwrap_err();
        assert!(err.to_string().contains("MEM_OOB"));
    }

    #[test]
    fn test_prune_rejects_extra_registers() {
        let args = PruneArgs {
            registers: vec![1, 2, 3, 4, 99],
            ..prune_args("save 0 1; inc 3")
        };
        let err = prune_program(&args).unwrap_err();
        assert!(err.to_string().contains("5 register values given for 4 registers"));
    }

    #[test]
    fn test_prune_uses_machine_dimensions() {
        // Default r0 is the memory size, so without `dec 0` the store lands
        // one past the last cell.
        let args = PruneArgs {
            machine: MachineArgs {
                num_registers: 2,
                memory_size: 4,
                max_steps: 100,
            },
            ..prune_args("inc 1; dec 0; save 0 0")
        };
        assert_eq!(prune_program(&args).unwrap(), "dec 0\nsave 0 0\n");

        let args = PruneArgs {
            machine: MachineArgs {
                num_registers: 2,
                ..MachineArgs::default()
            },
            ..prune_args("inc 3")
        };
        assert!(prune_program(&args).is_err());
    }

    #[test]
    fn test_generate_with_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_memory_samples": 3, "max_attempts": 5}}"#).unwrap();

        let args = GenerateArgs {
            code: Some("load 2 1; inc 2; save 2 1".to_string()),
            config: Some(file.path().to_path_buf()),
            seed: Some(11),
            no_loop: false,
            max_attempts: None,
        };
        let episode: Episode = serde_json::from_str(&generate_episode(&args).unwrap()).unwrap();
        assert_eq!(episode.memories.len(), 3);
        assert_eq!(episode.mem_out.len(), 3 * 16);
    }

    #[test]
    fn test_enumerate() {
        let listing = enumerate(&EnumerateArgs { num_registers: 2 }).unwrap();
        assert_eq!(listing.lines().next(), Some("end"));
        assert!(listing.lines().any(|l| l == "mov 1 0"));
    }
}
