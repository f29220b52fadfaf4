//! Core type definitions shared by the linker, engine and generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Register file contents.
pub type Registers = Vec<i32>;

/// Memory array contents.
pub type Memory = Vec<i32>;

/// Terminal (or running) status of a machine run.
///
/// The numeric codes are part of the feature format and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaltCode {
    /// The program counter left the program normally.
    Ended,
    Running,
    /// A `load`/`save` addressed memory outside its bounds.
    MemOob,
    /// The step budget ran out while still inside the program.
    MaxStepsReached,
}

impl HaltCode {
    pub fn code(&self) -> i32 {
        match self {
            HaltCode::Ended => 0,
            HaltCode::Running => 1,
            HaltCode::MemOob => 3,
            HaltCode::MaxStepsReached => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(HaltCode::Ended),
            1 => Some(HaltCode::Running),
            3 => Some(HaltCode::MemOob),
            5 => Some(HaltCode::MaxStepsReached),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, HaltCode::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HaltCode::Ended)
    }
}

impl Default for HaltCode {
    fn default() -> Self {
        HaltCode::Running
    }
}

impl fmt::Display for HaltCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HaltCode::Ended => "END",
            HaltCode::Running => "RUNNING",
            HaltCode::MemOob => "MEM_OOB",
            HaltCode::MaxStepsReached => "MAX_STEPS_REACHED",
        };
        write!(f, "{}", name)
    }
}
