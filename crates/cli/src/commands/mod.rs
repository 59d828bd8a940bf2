//! Subcommand implementations

pub mod predict;
pub mod status;
