//! Program synthesis on top of the register machine.
//!
//! This module implements greedy pruning of sampled programs and the
//! generation of traced episodes used as training data.

pub mod generator;
pub mod pruner;

pub use generator::{Episode, Generator};
pub use pruner::{apply_to_memories, GreedyPruner, PruneOutcome, PrunedProgram, SampleFailure};
