//! CLI entry point for the harvester.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use wikirag_harvester::cli;

fn main() -> ExitCode {
    // Quiet by default; RUST_LOG=debug exposes the retry/backoff chatter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
