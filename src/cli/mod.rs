//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{RunCommand, StateCommand, ValidateCommand};

/// Hierarchical pipeline execution engine
#[derive(Debug, Parser, Clone)]
#[command(name = "stagehand")]
#[command(version = "0.1.0")]
#[command(about = "Run declarative pipelines of stages, jobs and steps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Validate a pipeline file without running it
    Validate(ValidateCommand),

    /// Print the state tree a pipeline file compiles to
    State(StateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }
}
