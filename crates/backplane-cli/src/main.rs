//! Backplane CLI: the `backplane` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { json } => commands::validate::run(&cli.manifest, json),
        Commands::Migrate { output } => commands::migrate::run(&cli.manifest, output.as_deref()),
        Commands::Openapi { output } => commands::openapi::run(&cli.manifest, output.as_deref()),
        Commands::Types { output } => commands::types::run(&cli.manifest, output.as_deref()),
        Commands::Serve { addr, secret } => commands::serve::run(&cli.manifest, &addr, &secret),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
