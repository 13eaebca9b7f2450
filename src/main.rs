use clap::Parser;
use signalguard::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
