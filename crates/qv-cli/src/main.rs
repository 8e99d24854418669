//! Quiver CLI - validate, optimize and run query-expression plans

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod document;

use cli::Cli;
use commands::{check, optimize, rules, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match &cli.command {
        cli::Commands::Check(args) => check::execute(args, &cli.global).await,
        cli::Commands::Optimize(args) => optimize::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Rules(args) => rules::execute(args, &cli.global).await,
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .try_init();
}
