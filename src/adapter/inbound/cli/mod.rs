//! CLI module graph.

pub mod command;
pub mod run;

pub use command::{Cli, Commands};
pub use run::execute;
