//! Binary for ivyaiger

mod cli;

use clap::Parser;

#[doc(hidden)]
fn main() {
    env_logger::init();
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Check(a) => a.run(),
        cli::Commands::Emit(a) => a.run(),
        cli::Commands::Witness(a) => a.run(),
    }
}
