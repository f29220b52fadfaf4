//! Core types and utilities for the regvm register machine and program synthesizer.

pub mod types;
pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
