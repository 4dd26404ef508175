//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use beacon_cli::CliError;
use env_logger::Env;

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on standard error"
)]
fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    match beacon_cli::run() {
        Ok(()) => {}
        // Clap renders help, version, and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("beacon: {err}");
            std::process::exit(1);
        }
    }
}
