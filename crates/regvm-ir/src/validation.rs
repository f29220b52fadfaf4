//! Static checks performed once at link time.

use crate::instruction::Instruction;
use regvm_core::{Error, Result};

/// Validate that every register operand names an existing register.
///
/// Register indices are constants embedded in the instruction, so a program
/// that passes here can never address a missing register while running.
/// `end` operands are ignored and repeated registers are accepted.
pub fn validate_registers(instructions: &[Instruction], num_registers: usize) -> Result<()> {
    for (index, inst) in instructions.iter().enumerate() {
        for register in inst.register_operands() {
            let in_range = usize::try_from(register)
                .map(|r| r < num_registers)
                .unwrap_or(false);
            if !in_range {
                return Err(Error::Structural {
                    index,
                    instruction: inst.to_string(),
                    register,
                    num_registers,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn test_validate_empty_program() {
        assert!(validate_registers(&[], 4).is_ok());
    }

    #[test]
    fn test_validate_valid_program() {
        let program = vec![
            Instruction::rep(0),
            Instruction::load(1, 2),
            Instruction::save(3, 2),
            Instruction::end(),
        ];
        assert!(validate_registers(&program, 4).is_ok());
    }

    #[test]
    fn test_register_out_of_range() {
        let program = vec![Instruction::inc(0), Instruction::mov(1, 4)];
        match validate_registers(&program, 4) {
            Err(Error::Structural {
                index, register, ..
            }) => {
                assert_eq!(index, 1);
                assert_eq!(register, 4);
            }
            other => panic!("expected structural error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_register_rejected() {
        let program = vec![Instruction::dec(-1)];
        assert!(matches!(
            validate_registers(&program, 4),
            Err(Error::Structural { register: -1, .. })
        ));
    }

    #[test]
    fn test_end_operands_ignored() {
        let program = vec![Instruction::new(Opcode::End, 99, 42)];
        assert!(validate_registers(&program, 1).is_ok());
    }

    #[test]
    fn test_repeated_register_accepted() {
        let program = vec![Instruction::cmp(1, 1)];
        assert!(validate_registers(&program, 2).is_ok());
    }
}
