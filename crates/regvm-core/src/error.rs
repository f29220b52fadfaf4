//! Error types for the machine, linker and generator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error in {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// A register operand is outside `[0, num_registers)`. Raised at link
    /// time, never during execution.
    #[error(
        "Structural error at instruction {index} ({instruction}): register {register} out of range for {num_registers} registers"
    )]
    Structural {
        index: usize,
        instruction: String,
        register: i32,
        num_registers: usize,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gave up after {attempts} attempts: {reason}")]
    Exhausted { attempts: usize, reason: String },
}

impl Error {
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_message_names_register() {
        let err = Error::Structural {
            index: 2,
            instruction: "mov 0 7".to_string(),
            register: 7,
            num_registers: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("instruction 2"));
        assert!(msg.contains("register 7"));
    }

    #[test]
    fn test_json_error_converts() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
