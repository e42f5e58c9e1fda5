//! rem CLI library components.
//!
//! This crate provides the command-line interface for the ripple-effect
//! analysis. The main binary is in `main.rs`.

pub mod commands;
pub mod formatters;

pub use commands::{AnalyzeArgs, ConfigCommand};
pub use formatters::{Formatter, OutputFormat};
