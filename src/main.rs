use clap::Parser;
use tradewind::cli::{Cli, run};
use tradewind::logging;

fn main() -> std::process::ExitCode {
    logging::init();
    run(Cli::parse())
}
