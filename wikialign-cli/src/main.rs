//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use wikialign_cli::CliError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match wikialign_cli::run() {
        Ok(()) => {}
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("wikialign: {err}");
            std::process::exit(1);
        }
    }
}
