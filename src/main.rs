use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = tortuga::cli::Cli::parse();
    tortuga::cli::run(cli)
}
