//! domlens CLI entry point.

use clap::Parser;
use domlens::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let exit_code = match cli.command {
        Commands::Analyze(args) => match cli::run_analyze(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                EXIT_ERROR
            }
        },
        Commands::Init(args) => match cli::run_init(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
        Commands::Settings(args) => match cli::run_settings(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(exit_code);
}
