//! Textual program forms: `;`-joined one-liners and line-per-instruction listings.

use crate::instruction::Instruction;
use regvm_core::Result;
use std::path::Path;

/// Parse instructions separated by `;`. Empty segments are skipped.
pub fn parse_program(text: &str) -> Result<Vec<Instruction>> {
    text.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|s| s.parse::<Instruction>())
        .collect()
}

/// Parse one instruction per line; blank lines and `#` comments are skipped.
pub fn parse_listing(text: &str) -> Result<Vec<Instruction>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|s| s.parse::<Instruction>())
        .collect()
}

/// Read a listing from a file
pub fn load_listing(path: impl AsRef<Path>) -> Result<Vec<Instruction>> {
    let text = std::fs::read_to_string(path)?;
    parse_listing(&text)
}

/// One instruction per line, newline terminated
pub fn render_listing(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|inst| format!("{}\n", inst))
        .collect()
}

/// Single-line form accepted by [`parse_program`]
pub fn render_program(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(Instruction::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
