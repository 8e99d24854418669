//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Quiver - build, optimize and run deferred query-expression plans
#[derive(Parser, Debug)]
#[command(name = "qv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to quiver.yml (default: quiver.yml in the current directory, if present)
    #[arg(short, long, global = true, env = "QUIVER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and validate a plan document, printing the output schema
    Check(CheckArgs),

    /// Optimize a plan and print it before and after
    Optimize(OptimizeArgs),

    /// Run a plan on the in-memory backend
    Run(RunArgs),

    /// List the rewrite rules
    Rules(RulesArgs),
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Plan document (YAML)
    pub plan: PathBuf,

    /// Print every relation of the document, not only the output
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for the optimize command
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Plan document (YAML)
    pub plan: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OptimizeOutput,
}

/// Optimize output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeOutput {
    /// Indented plans and a rule summary
    Text,
    /// Machine-readable report
    Json,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plan document (YAML)
    pub plan: PathBuf,

    /// Execute the plan as written, skipping the rewrite engine
    #[arg(long)]
    pub no_optimize: bool,
}

/// Arguments for the rules command
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Only list rules enabled by the configuration
    #[arg(short, long)]
    pub enabled: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
