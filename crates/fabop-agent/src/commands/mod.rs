//! Subcommand implementations

pub mod queues;
pub mod run;
