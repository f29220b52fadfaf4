//! Command-line front end for the register machine.

mod commands;
mod telemetry;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{EnumerateArgs, GenerateArgs, PruneArgs, RunArgs};

#[derive(Parser, Debug)]
#[command(name = "regvm", version, about = "Run, prune and sample register-machine programs")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a program and print the outcome as JSON
    Run(RunArgs),
    /// Remove instructions that do not affect the final memory
    Prune(PruneArgs),
    /// Sample, prune and trace a program on random memories
    Generate(GenerateArgs),
    /// List every legal instruction
    Enumerate(EnumerateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.json_logs)?;

    let output = match &cli.command {
        Command::Run(args) => commands::run_program(args)?,
        Command::Prune(args) => commands::prune_program(args)?,
        Command::Generate(args) => commands::generate_episode(args)?,
        Command::Enumerate(args) => commands::enumerate(args)?,
    };
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
